use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::load_config;
use crate::scoring::{run_scoring, top_k};

pub struct ScoreCommand {
    pub config: PathBuf,
    pub top_k: usize,
}

pub fn score_dataset(command: ScoreCommand) -> Result<()> {
    let config = load_config(&command.config)?;
    let predictions = run_scoring(&config)?;
    let head = top_k(&predictions, command.top_k);

    super::heading(&format!(
        "Top {} of {} releases by failure risk",
        head.len(),
        predictions.len()
    ));
    println!("{}", super::predictions_table(head));
    println!(
        "{} {}",
        "Predictions written to".green(),
        config.paths.predictions.display()
    );
    Ok(())
}
