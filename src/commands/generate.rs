use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use crate::data::{generate_releases, write_dataset};

pub struct GenerateCommand {
    pub rows: usize,
    pub out: PathBuf,
    pub seed: u64,
    pub anchor_date: Option<NaiveDate>,
}

pub fn generate_dataset(command: GenerateCommand) -> Result<()> {
    let anchor = command
        .anchor_date
        .unwrap_or_else(|| Local::now().date_naive());
    let mut rng = StdRng::seed_from_u64(command.seed);
    let records = generate_releases(command.rows, anchor, &mut rng)?;
    write_dataset(&command.out, &records)
        .with_context(|| format!("writing {}", command.out.display()))?;

    let failures = records.iter().filter(|r| r.deploy_failed == 1).count();
    let rate = if records.is_empty() {
        0.0
    } else {
        failures as f64 / records.len() as f64
    };
    println!(
        "{} {} releases to {} (seed {}, failure rate {})",
        "Generated".green().bold(),
        records.len(),
        command.out.display(),
        command.seed,
        super::percent(rate)
    );
    Ok(())
}
