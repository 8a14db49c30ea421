//! Release-log schema, the synthetic generator and CSV table I/O.

pub mod generator;
pub mod table;

pub use generator::{failure_logit, failure_probability, generate_releases, write_dataset};
pub use table::{load_table, Labels, ReleaseMeta, ReleaseTable};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const RELEASE_ID: &str = "release_id";
pub const RELEASE_DATETIME: &str = "release_datetime";
pub const MODULE: &str = "module";
pub const ENVIRONMENT: &str = "environment";
/// Label column written by the generator.
pub const DEPLOY_FAILED: &str = "deploy_failed";

/// Identifier columns carried into every predictions table.
pub const META_COLUMNS: [&str; 4] = [RELEASE_ID, RELEASE_DATETIME, MODULE, ENVIRONMENT];

pub const CATEGORICAL_FEATURES: [&str; 2] = [MODULE, ENVIRONMENT];

pub const NUMERICAL_FEATURES: [&str; 13] = [
    "commits",
    "lines_changed",
    "test_coverage",
    "defects_open",
    "prior_failed_deploys",
    "build_success_rate",
    "lead_time_days",
    "cycle_time_days",
    "code_smells",
    "vulnerabilities",
    "team_experience_years",
    "hour_of_day",
    "day_of_week",
];

pub const MODULES: [&str; 6] = [
    "core-banking",
    "payments",
    "risk-engine",
    "onboarding",
    "mobile-app",
    "internet-banking",
];

/// Deployment tiers in increasing order of risk weight.
pub const ENVIRONMENTS: [&str; 4] = ["dev", "qa", "staging", "prod"];

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One release as written by the generator.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub release_id: u64,
    #[serde(with = "datetime_format")]
    pub release_datetime: NaiveDateTime,
    pub module: String,
    pub environment: String,
    pub commits: u32,
    pub lines_changed: u32,
    pub test_coverage: f64,
    pub defects_open: u32,
    pub prior_failed_deploys: u32,
    pub build_success_rate: f64,
    pub lead_time_days: f64,
    pub cycle_time_days: f64,
    pub code_smells: u32,
    pub vulnerabilities: u32,
    pub team_experience_years: f64,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub deploy_failed: u8,
}

impl ReleaseRecord {
    /// Numeric signals in [`NUMERICAL_FEATURES`] order.
    pub fn numeric_signals(&self) -> [f64; 13] {
        [
            f64::from(self.commits),
            f64::from(self.lines_changed),
            self.test_coverage,
            f64::from(self.defects_open),
            f64::from(self.prior_failed_deploys),
            self.build_success_rate,
            self.lead_time_days,
            self.cycle_time_days,
            f64::from(self.code_smells),
            f64::from(self.vulnerabilities),
            self.team_experience_years,
            f64::from(self.hour_of_day),
            f64::from(self.day_of_week),
        ]
    }
}

mod datetime_format {
    use super::DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(DATETIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
