// Shared fixtures for deployrisk integration tests
#![allow(dead_code)]

use chrono::NaiveDate;
use deployrisk::config::{parse_config, DEFAULT_CONFIG_YAML};
use deployrisk::data::{generate_releases, write_dataset, ReleaseRecord};
use deployrisk::PipelineConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

pub fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

pub fn releases(rows: usize, seed: u64) -> Vec<ReleaseRecord> {
    generate_releases(rows, anchor(), &mut StdRng::seed_from_u64(seed)).unwrap()
}

/// Default configuration with every artifact under `root`.
pub fn config_under(root: &Path) -> PipelineConfig {
    let mut config = parse_config(DEFAULT_CONFIG_YAML).unwrap();
    config.paths.data = root.join("data").join("releases.csv");
    config.paths.model = root.join("models").join("model.bin");
    config.paths.predictions = root.join("data").join("predictions.csv");
    config.paths.metrics = root.join("data").join("metrics.json");
    config.paths.importance_plot = root.join("data").join("importance.svg");
    config
}

/// Write `rows` generated releases to the configured dataset path.
pub fn seed_dataset(config: &PipelineConfig, rows: usize, seed: u64) -> Vec<ReleaseRecord> {
    let records = releases(rows, seed);
    write_dataset(&config.paths.data, &records).unwrap();
    records
}
