//! Explain stage: permutation importance, the importance chart, ranked
//! predictions and a text summary of the riskiest releases.
//!
//! Importance and chart failures degrade the run instead of aborting it.
//! They are collected as notices while predictions and the summary still
//! complete.

pub mod chart;
pub mod importance;
pub mod summary;

pub use chart::render_importance_chart;
pub use importance::{permutation_importance, rank_importances, FeatureImportance, ImportanceOptions};
pub use summary::{summarize, GroupRisk, InsightSummary};

use std::path::PathBuf;

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::data::{load_table, Labels, ReleaseTable};
use crate::errors::{Error, Result};
use crate::pipeline::FittedPipeline;
use crate::scoring::{score_releases, write_predictions, Prediction};
use crate::training::DECISION_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsightsOptions {
    /// Rows summarised from the top of the ranking
    pub k: usize,
    pub n_repeats: usize,
    /// Bars drawn in the chart
    pub plot_top: usize,
}

impl InsightsOptions {
    pub fn from_config(config: &PipelineConfig, k: usize) -> Self {
        Self {
            k,
            n_repeats: config.insights.n_repeats,
            plot_top: config.insights.plot_top,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightsReport {
    pub predictions: Vec<Prediction>,
    /// Ranked importances, absent when the computation failed
    pub importances: Option<Vec<FeatureImportance>>,
    /// Chart location, absent when nothing was rendered
    pub chart: Option<PathBuf>,
    pub notices: Vec<String>,
    pub summary: InsightSummary,
}

impl InsightsReport {
    pub fn is_degraded(&self) -> bool {
        !self.notices.is_empty()
    }
}

fn degrade(notices: &mut Vec<String>, stage: &str, err: &Error) {
    warn!(stage, error = %err, "insights degraded");
    notices.push(format!("{stage} unavailable: {err}"));
}

/// Importance and chart for a labelled table. Recoverable failures land
/// in `notices`; anything else is returned.
fn explain(
    config: &PipelineConfig,
    options: InsightsOptions,
    pipeline: &FittedPipeline,
    table: &ReleaseTable,
    progress: &ProgressBar,
    notices: &mut Vec<String>,
) -> Result<(Option<Vec<FeatureImportance>>, Option<PathBuf>)> {
    let importance_options = ImportanceOptions {
        n_repeats: options.n_repeats,
        seed: config.seed,
        threshold: DECISION_THRESHOLD,
    };
    let importances = table
        .require_labels(&config.target)
        .map_err(|e| Error::Explainability(e.to_string()))
        .and_then(|labels| {
            permutation_importance(pipeline, &table.features, labels, importance_options, progress)
        });
    let importances = match importances {
        Ok(ranked) => ranked,
        Err(e) if e.is_recoverable() => {
            degrade(notices, "feature importance", &e);
            return Ok((None, None));
        }
        Err(e) => return Err(e),
    };

    let path = &config.paths.importance_plot;
    let chart = match render_importance_chart(path, &importances, options.plot_top) {
        Ok(()) => {
            info!(path = %path.display(), "importance chart written");
            Some(path.clone())
        }
        Err(e) if e.is_recoverable() => {
            degrade(notices, "importance chart", &e);
            None
        }
        Err(e) => return Err(e),
    };
    Ok((Some(importances), chart))
}

/// Full explain stage over `paths.data` with the persisted model.
pub fn run_insights(
    config: &PipelineConfig,
    options: InsightsOptions,
    progress: &ProgressBar,
) -> Result<InsightsReport> {
    let pipeline = FittedPipeline::load(&config.paths.model)?;
    let table = load_table(&config.paths.data, Labels::Required(&config.target))?;
    info!(rows = table.len(), n_repeats = options.n_repeats, "explaining releases");

    let mut notices = Vec::new();
    let (importances, chart) = explain(config, options, &pipeline, &table, progress, &mut notices)?;

    let predictions = score_releases(&pipeline, &table)?;
    write_predictions(&config.paths.predictions, &predictions)?;
    let summary = summarize(&predictions, options.k)?;
    info!(
        predictions = %config.paths.predictions.display(),
        degraded = !notices.is_empty(),
        "insights complete"
    );

    Ok(InsightsReport {
        predictions,
        importances,
        chart,
        notices,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, DEFAULT_CONFIG_YAML};
    use crate::data::generator::generate_releases;
    use crate::data::write_dataset;
    use crate::training::train_pipeline;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> PipelineConfig {
        let mut config = parse_config(DEFAULT_CONFIG_YAML).unwrap();
        let root = dir.path();
        config.paths.data = root.join("releases.csv");
        config.paths.model = root.join("model.bin");
        config.paths.predictions = root.join("predictions.csv");
        config.paths.metrics = root.join("metrics.json");
        config.paths.importance_plot = root.join("importance.svg");
        config.model.params.insert("n_estimators".into(), 10.into());
        config
    }

    fn prepare(dir: &TempDir) -> PipelineConfig {
        let config = config_in(dir);
        let anchor = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let records = generate_releases(120, anchor, &mut StdRng::seed_from_u64(5)).unwrap();
        write_dataset(&config.paths.data, &records).unwrap();
        train_pipeline(&config).unwrap();
        config
    }

    #[test]
    fn test_full_run_writes_every_artifact() {
        let dir = TempDir::new().unwrap();
        let config = prepare(&dir);
        let options = InsightsOptions::from_config(&config, 10);
        let report = run_insights(&config, options, &ProgressBar::hidden()).unwrap();

        assert!(!report.is_degraded());
        assert_eq!(report.predictions.len(), 120);
        assert_eq!(report.importances.as_ref().map(Vec::len), Some(15));
        assert!(config.paths.importance_plot.exists());
        assert!(config.paths.predictions.exists());
        assert_eq!(report.summary.k, 10);
    }

    #[test]
    fn test_chart_failure_is_a_notice() {
        let dir = TempDir::new().unwrap();
        let mut config = prepare(&dir);
        // A directory in place of the chart file makes the SVG write fail.
        std::fs::create_dir_all(dir.path().join("blocked.svg")).unwrap();
        config.paths.importance_plot = dir.path().join("blocked.svg");

        let options = InsightsOptions::from_config(&config, 5);
        let report = run_insights(&config, options, &ProgressBar::hidden()).unwrap();
        assert!(report.is_degraded());
        assert!(report.importances.is_some());
        assert!(report.chart.is_none());
        assert_eq!(report.predictions.len(), 120);
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let options = InsightsOptions::from_config(&config, 5);
        let err = run_insights(&config, options, &ProgressBar::hidden()).unwrap_err();
        assert!(matches!(err, Error::ArtifactNotFound { .. }));
    }
}
