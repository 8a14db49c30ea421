//! Synthetic release-log generator.
//!
//! Labels are drawn from a latent, non-linear risk function so the
//! generated data has a known ground truth. The random source is always
//! passed in by the caller; nothing here touches a global RNG, so two
//! generators seeded alike produce identical rows and can run side by side.

use std::path::Path;

use chrono::{Days, NaiveDate, NaiveTime};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::{
    ReleaseRecord, DEPLOY_FAILED, ENVIRONMENTS, META_COLUMNS, MODULES, NUMERICAL_FEATURES,
};
use crate::errors::{Error, Result};
use crate::io;

/// Rows generated when training finds no dataset on disk.
pub const DEFAULT_ROWS: usize = 800;

/// Selection weight of each entry in [`ENVIRONMENTS`].
pub const ENVIRONMENT_WEIGHTS: [f64; 4] = [0.10, 0.25, 0.30, 0.35];

/// Releases are spread over the year before the anchor date.
const HISTORY_DAYS: i64 = 365;

/// Coefficients of the latent failure logit.
pub mod latent {
    pub const INTERCEPT: f64 = -1.0;
    pub const COVERAGE_GAP: f64 = 0.8;
    pub const DEFECTS_OPEN: f64 = 0.02;
    pub const LINES_CHANGED: f64 = 0.0004;
    pub const BUILD_FAILURE_RATE: f64 = 0.6;
    pub const PRIOR_FAILURES: f64 = 0.25;
    pub const VULNERABILITIES: f64 = 0.03;
    pub const CODE_SMELLS: f64 = 0.015;
    pub const LONG_LEAD_TIME: f64 = 0.05;
    pub const LONG_CYCLE_TIME: f64 = 0.05;
    pub const PROD: f64 = 0.15;
    pub const AFTER_HOURS: f64 = 0.1;
    pub const END_OF_WEEK: f64 = 0.05;
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Latent failure logit of a release.
pub fn failure_logit(record: &ReleaseRecord) -> f64 {
    latent::INTERCEPT
        + latent::COVERAGE_GAP * (1.0 - record.test_coverage)
        + latent::DEFECTS_OPEN * f64::from(record.defects_open)
        + latent::LINES_CHANGED * f64::from(record.lines_changed)
        + latent::BUILD_FAILURE_RATE * (1.0 - record.build_success_rate)
        + latent::PRIOR_FAILURES * indicator(record.prior_failed_deploys > 0)
        + latent::VULNERABILITIES * f64::from(record.vulnerabilities)
        + latent::CODE_SMELLS * f64::from(record.code_smells)
        + latent::LONG_LEAD_TIME * indicator(record.lead_time_days > 10.0)
        + latent::LONG_CYCLE_TIME * indicator(record.cycle_time_days > 5.0)
        + latent::PROD * indicator(record.environment == "prod")
        + latent::AFTER_HOURS * indicator(record.hour_of_day >= 18)
        + latent::END_OF_WEEK * indicator(matches!(record.day_of_week, 5 | 6))
}

/// Failure probability, `sigmoid(failure_logit)`.
pub fn failure_probability(record: &ReleaseRecord) -> f64 {
    1.0 / (1.0 + (-failure_logit(record)).exp())
}

/// Per-field sampling distributions.
struct SignalDistributions {
    commits: Normal<f64>,
    lines_changed: Normal<f64>,
    test_coverage: Normal<f64>,
    defects_open: Normal<f64>,
    build_success_rate: Normal<f64>,
    lead_time_days: Normal<f64>,
    cycle_time_days: Normal<f64>,
    code_smells: Normal<f64>,
    vulnerabilities: Normal<f64>,
    team_experience_years: Normal<f64>,
}

impl SignalDistributions {
    fn new() -> Result<Self> {
        let normal = |mean: f64, std_dev: f64| {
            Normal::new(mean, std_dev)
                .map_err(|e| Error::config(format!("invalid generator distribution: {e}")))
        };
        Ok(Self {
            commits: normal(25.0, 10.0)?,
            lines_changed: normal(1500.0, 600.0)?,
            test_coverage: normal(0.72, 0.1)?,
            defects_open: normal(12.0, 5.0)?,
            build_success_rate: normal(0.9, 0.08)?,
            lead_time_days: normal(6.0, 2.0)?,
            cycle_time_days: normal(3.0, 1.0)?,
            code_smells: normal(35.0, 12.0)?,
            vulnerabilities: normal(4.0, 3.0)?,
            team_experience_years: normal(3.2, 1.1)?,
        })
    }
}

/// Truncate toward zero, then floor at `min`.
fn count_at_least(value: f64, min: i64) -> u32 {
    (value.trunc() as i64).max(min) as u32
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn pick_weighted<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> usize {
    let u: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if u < cumulative {
            return i;
        }
    }
    weights.len() - 1
}

/// Generate `rows` labelled releases dated within the year before `anchor`.
///
/// Draw order per row is fixed, so the output depends only on the RNG
/// state, `rows` and `anchor`.
pub fn generate_releases<R: Rng + ?Sized>(
    rows: usize,
    anchor: NaiveDate,
    rng: &mut R,
) -> Result<Vec<ReleaseRecord>> {
    let dist = SignalDistributions::new()?;
    let mut records = Vec::with_capacity(rows);

    for i in 0..rows {
        let days_ago = rng.gen_range(0..HISTORY_DAYS);
        let commits = count_at_least(dist.commits.sample(rng), 0);
        let lines_changed = count_at_least(dist.lines_changed.sample(rng).abs(), 1);
        let test_coverage = dist.test_coverage.sample(rng).clamp(0.2, 0.99);
        let defects_open = count_at_least(dist.defects_open.sample(rng), 0);
        let prior_failed_deploys = (0..3).filter(|_| rng.gen_bool(0.25)).count() as u32;
        let build_success_rate = dist.build_success_rate.sample(rng).clamp(0.4, 1.0);
        let lead_time_days = dist.lead_time_days.sample(rng).clamp(1.0, 30.0);
        let cycle_time_days = dist.cycle_time_days.sample(rng).clamp(0.5, 20.0);
        let code_smells = count_at_least(dist.code_smells.sample(rng), 0);
        let vulnerabilities = count_at_least(dist.vulnerabilities.sample(rng), 0);
        let team_experience_years = dist.team_experience_years.sample(rng).clamp(0.2, 8.0);
        let environment = ENVIRONMENTS[pick_weighted(rng, &ENVIRONMENT_WEIGHTS)];
        let module = MODULES[rng.gen_range(0..MODULES.len())];
        let hour_of_day = rng.gen_range(0..24u32);
        let day_of_week = rng.gen_range(0..7u32);

        let date = anchor
            .checked_sub_days(Days::new(days_ago as u64))
            .unwrap_or(anchor);
        let time = NaiveTime::from_hms_opt(hour_of_day, 0, 0).unwrap_or_default();

        let mut record = ReleaseRecord {
            release_id: i as u64,
            release_datetime: date.and_time(time),
            module: module.to_string(),
            environment: environment.to_string(),
            commits,
            lines_changed,
            test_coverage,
            defects_open,
            prior_failed_deploys,
            build_success_rate,
            lead_time_days,
            cycle_time_days,
            code_smells,
            vulnerabilities,
            team_experience_years,
            hour_of_day,
            day_of_week,
            deploy_failed: 0,
        };

        // The label comes from the unrounded draws.
        let p_fail = failure_probability(&record);
        record.deploy_failed = u8::from(rng.gen::<f64>() < p_fail);

        record.test_coverage = round_to(record.test_coverage, 3);
        record.build_success_rate = round_to(record.build_success_rate, 3);
        record.lead_time_days = round_to(record.lead_time_days, 2);
        record.cycle_time_days = round_to(record.cycle_time_days, 2);
        record.team_experience_years = round_to(record.team_experience_years, 1);

        records.push(record);
    }

    tracing::debug!(rows, %anchor, "generated synthetic releases");
    Ok(records)
}

/// Write records as CSV with a header row, creating parent directories.
pub fn write_dataset(path: &Path, records: &[ReleaseRecord]) -> Result<()> {
    io::ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    // serialize() only emits the header alongside the first record.
    if records.is_empty() {
        writer.write_record(
            META_COLUMNS
                .iter()
                .chain(NUMERICAL_FEATURES.iter())
                .chain([DEPLOY_FAILED].iter()),
        )?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
