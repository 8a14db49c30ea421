//! Score stage: risk per release, ranked highest first.

mod predictions;

pub use predictions::{read_predictions, write_predictions};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::data::{load_table, Labels, ReleaseTable};
use crate::errors::{Error, Result};
use crate::pipeline::FittedPipeline;

/// One scored release. Field order is the predictions CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub release_id: u64,
    pub release_datetime: String,
    pub module: String,
    pub environment: String,
    pub risk_score: f64,
}

/// Score every row of `table` and rank the result.
///
/// Either the whole table is scored or an error is returned.
pub fn score_releases(pipeline: &FittedPipeline, table: &ReleaseTable) -> Result<Vec<Prediction>> {
    let scores = pipeline.predict_proba(&table.features)?;
    if scores.len() != table.len() {
        return Err(Error::DataSchema(format!(
            "{} scores for {} releases",
            scores.len(),
            table.len()
        )));
    }
    let mut predictions: Vec<Prediction> = table
        .meta
        .iter()
        .zip(scores)
        .map(|(meta, risk_score)| Prediction {
            release_id: meta.release_id,
            release_datetime: meta.release_datetime.clone(),
            module: meta.module.clone(),
            environment: meta.environment.clone(),
            risk_score,
        })
        .collect();
    rank(&mut predictions);
    Ok(predictions)
}

/// Stable sort, highest risk first. Equal scores keep their input order.
pub fn rank(predictions: &mut [Prediction]) {
    predictions.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
}

pub fn is_ranked(predictions: &[Prediction]) -> bool {
    predictions
        .windows(2)
        .all(|w| w[0].risk_score >= w[1].risk_score)
}

/// The first `k` rows of a ranked table, or all of them when shorter.
pub fn top_k(predictions: &[Prediction], k: usize) -> &[Prediction] {
    &predictions[..k.min(predictions.len())]
}

/// Full score stage: load model and data, score, persist the ranking.
pub fn run_scoring(config: &PipelineConfig) -> Result<Vec<Prediction>> {
    let pipeline = FittedPipeline::load(&config.paths.model)?;
    let table = load_table(&config.paths.data, Labels::Ignore)?;
    let predictions = score_releases(&pipeline, &table)?;
    write_predictions(&config.paths.predictions, &predictions)?;
    info!(
        rows = predictions.len(),
        path = %config.paths.predictions.display(),
        "predictions written"
    );
    Ok(predictions)
}
