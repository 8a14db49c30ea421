use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::config::load_config;
use crate::training::{train_pipeline, ClassScores, DataSource};

fn class_row(label: &str, scores: &ClassScores) -> Vec<String> {
    vec![
        label.to_string(),
        format!("{:.3}", scores.precision),
        format!("{:.3}", scores.recall),
        format!("{:.3}", scores.f1_score),
        scores.support.to_string(),
    ]
}

pub fn train_model(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let outcome = train_pipeline(&config)?;
    let metrics = &outcome.metrics;

    if outcome.source == DataSource::Generated {
        println!(
            "{} {} not found, trained on generated releases",
            "note:".yellow().bold(),
            config.paths.data.display()
        );
    }

    super::heading("Training complete");
    println!(
        "model: {} (requested {:?})",
        metrics.model.cyan(),
        config.model.kind
    );
    println!(
        "rows: {} train / {} test",
        metrics.train_rows, metrics.test_rows
    );
    println!("ROC AUC: {:.4}", metrics.roc_auc);
    println!("Average precision: {:.4}", metrics.avg_precision);

    let report = &metrics.report;
    let mut table = super::styled_table(&["class", "precision", "recall", "f1-score", "support"]);
    table.add_row(class_row("0", &report.negative));
    table.add_row(class_row("1", &report.positive));
    table.add_row(class_row("macro avg", &report.macro_avg));
    table.add_row(class_row("weighted avg", &report.weighted_avg));
    println!("{table}");
    println!("accuracy: {:.3}", report.accuracy);

    println!("model written to {}", config.paths.model.display());
    println!("metrics written to {}", config.paths.metrics.display());
    Ok(())
}
