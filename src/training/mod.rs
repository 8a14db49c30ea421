//! Train stage: split, fit, evaluate, persist.

pub mod metrics;
pub mod split;

pub use metrics::{
    average_precision, classification_report, predict_labels, roc_auc, ClassScores,
    ClassificationReport, EvaluationMetrics,
};
pub use split::{stratified_split, Split};

use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::data::generator::{generate_releases, DEFAULT_ROWS};
use crate::data::{load_table, Labels, ReleaseTable};
use crate::errors::Result;
use crate::pipeline::{build_pipeline, FittedPipeline};

/// Scores above this predict a failed deployment.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Where the training rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    File,
    /// Default synthetic dataset; `paths.data` did not exist.
    Generated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub pipeline: FittedPipeline,
    pub metrics: EvaluationMetrics,
    pub source: DataSource,
}

/// Load `paths.data`, or generate the default dataset in memory when the
/// file does not exist. The generated rows are not written to disk.
pub fn load_or_generate(config: &PipelineConfig, anchor: NaiveDate) -> Result<(ReleaseTable, DataSource)> {
    if config.paths.data.exists() {
        let table = load_table(&config.paths.data, Labels::Required(&config.target))?;
        return Ok((table, DataSource::File));
    }
    warn!(
        path = %config.paths.data.display(),
        rows = DEFAULT_ROWS,
        "dataset not found, training on generated releases"
    );
    let mut rng = StdRng::seed_from_u64(config.seed);
    let records = generate_releases(DEFAULT_ROWS, anchor, &mut rng)?;
    Ok((ReleaseTable::from_records(&records)?, DataSource::Generated))
}

/// Split, fit on the training partition and evaluate on the test partition.
pub fn fit_and_evaluate(
    config: &PipelineConfig,
    table: &ReleaseTable,
) -> Result<(FittedPipeline, EvaluationMetrics)> {
    let labels = table.require_labels(&config.target)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let split = stratified_split(labels, config.test_size, &mut rng)?;

    let (spec, _) = build_pipeline(&config.model, config.seed)?;
    let train_frame = table.features.select_rows(&split.train);
    let train_labels: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();
    let pipeline = spec.fit(&train_frame, &train_labels)?;

    let test_frame = table.features.select_rows(&split.test);
    let test_labels: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();
    let scores = pipeline.predict_proba(&test_frame)?;
    let predicted = predict_labels(&scores, DECISION_THRESHOLD);

    let metrics = EvaluationMetrics {
        roc_auc: roc_auc(&test_labels, &scores)?,
        avg_precision: average_precision(&test_labels, &scores)?,
        report: classification_report(&test_labels, &predicted)?,
        model: pipeline.strategy().algorithm().to_string(),
        threshold: DECISION_THRESHOLD,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
    };
    Ok((pipeline, metrics))
}

/// Full train stage: data, fit, evaluation and both artifacts.
pub fn train_pipeline(config: &PipelineConfig) -> Result<TrainingOutcome> {
    let (table, source) = load_or_generate(config, Local::now().date_naive())?;
    info!(rows = table.len(), source = ?source, "training data ready");

    let (pipeline, metrics) = fit_and_evaluate(config, &table)?;
    pipeline.save(&config.paths.model)?;
    metrics.write(&config.paths.metrics)?;
    info!(
        model = %config.paths.model.display(),
        metrics = %config.paths.metrics.display(),
        roc_auc = metrics.roc_auc,
        avg_precision = metrics.avg_precision,
        "training complete"
    );

    Ok(TrainingOutcome {
        pipeline,
        metrics,
        source,
    })
}
