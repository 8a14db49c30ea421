use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::load_config;
use crate::insights::{run_insights, FeatureImportance, InsightsOptions};
use crate::progress::{ProgressConfig, TEMPLATE_IMPORTANCE};

pub struct ExplainCommand {
    pub config: PathBuf,
    pub k: usize,
    pub repeats: Option<usize>,
    pub quiet: bool,
}

fn importance_table(ranked: &[FeatureImportance]) -> comfy_table::Table {
    let mut table = super::styled_table(&["feature", "mean drop", "std"]);
    for item in ranked {
        table.add_row(vec![
            item.feature.clone(),
            format!("{:+.4}", item.mean),
            format!("{:.4}", item.std),
        ]);
    }
    table
}

pub fn explain_releases(command: ExplainCommand) -> Result<()> {
    let config = load_config(&command.config)?;
    let mut options = InsightsOptions::from_config(&config, command.k);
    if let Some(repeats) = command.repeats {
        anyhow::ensure!(repeats >= 1, "--repeats must be at least 1");
        options.n_repeats = repeats;
    }

    let progress =
        ProgressConfig::from_env(command.quiet).create_bar(TEMPLATE_IMPORTANCE, "Permutation importance");
    let report = run_insights(&config, options, &progress)?;

    if let Some(ranked) = &report.importances {
        super::heading("Feature importance (accuracy drop when shuffled)");
        println!("{}", importance_table(ranked));
    }
    if let Some(chart) = &report.chart {
        println!("chart written to {}", chart.display());
    }
    for notice in &report.notices {
        println!("{} {}", "warning:".yellow().bold(), notice);
    }

    super::heading("Summary");
    println!("{}", report.summary);
    println!(
        "{} {}",
        "Predictions written to".green(),
        config.paths.predictions.display()
    );
    Ok(())
}
