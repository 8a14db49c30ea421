//! CLI command implementations for deployrisk.
//!
//! Available commands:
//! - **generate**: Write a synthetic release log
//! - **train**: Fit the risk model and write model and metrics artifacts
//! - **score**: Rank releases by predicted failure risk
//! - **explain**: Permutation importance, chart and the weekly summary
//! - **init**: Write the default configuration file

pub mod explain;
pub mod generate;
pub mod init;
pub mod score;
pub mod train;

pub use explain::{explain_releases, ExplainCommand};
pub use generate::{generate_dataset, GenerateCommand};
pub use init::init_config;
pub use score::{score_dataset, ScoreCommand};
pub use train::train_model;

use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::scoring::Prediction;

fn heading(text: &str) {
    println!("{}", text.bold().underline());
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn styled_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

/// Ranked predictions as a table, highest risk first.
fn predictions_table(rows: &[Prediction]) -> Table {
    let mut table = styled_table(&["#", "release", "datetime", "module", "environment", "risk"]);
    for (rank, p) in rows.iter().enumerate() {
        table.add_row(vec![
            (rank + 1).to_string(),
            p.release_id.to_string(),
            p.release_datetime.clone(),
            p.module.clone(),
            p.environment.clone(),
            percent(p.risk_score),
        ]);
    }
    table
}
