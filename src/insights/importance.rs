//! Permutation importance over raw feature columns.
//!
//! A feature's importance is the accuracy lost when its column is shuffled
//! across rows. Each feature draws its permutations from its own RNG,
//! seeded from the run seed and the feature index, so features are
//! evaluated in parallel without changing the result.

use indicatif::{ParallelProgressIterator, ProgressBar};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::errors::{Error, Result};
use crate::features::FeatureFrame;
use crate::pipeline::FittedPipeline;
use crate::training::predict_labels;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportanceOptions {
    pub n_repeats: usize,
    pub seed: u64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Mean accuracy drop over repeats
    pub mean: f64,
    /// Population standard deviation of the drops
    pub std: f64,
    pub drops: Vec<f64>,
}

fn accuracy(pipeline: &FittedPipeline, frame: &FeatureFrame, labels: &[u8], threshold: f64) -> Result<f64> {
    let predicted = predict_labels(&pipeline.predict_proba(frame)?, threshold);
    let correct = predicted.iter().zip(labels).filter(|(p, y)| p == y).count();
    Ok(correct as f64 / labels.len() as f64)
}

fn explain_err(e: Error) -> Error {
    match e {
        Error::Explainability(_) => e,
        other => Error::Explainability(other.to_string()),
    }
}

/// Importance of every feature the pipeline consumes, highest first.
///
/// Any failure is reported as [`Error::Explainability`].
pub fn permutation_importance(
    pipeline: &FittedPipeline,
    frame: &FeatureFrame,
    labels: &[u8],
    options: ImportanceOptions,
    progress: &ProgressBar,
) -> Result<Vec<FeatureImportance>> {
    let n = frame.n_rows();
    if n == 0 || labels.len() != n {
        return Err(Error::Explainability(format!(
            "need one label per row, got {} labels for {n} rows",
            labels.len()
        )));
    }
    if options.n_repeats == 0 {
        return Err(Error::Explainability("n_repeats must be at least 1".into()));
    }

    let baseline = accuracy(pipeline, frame, labels, options.threshold).map_err(explain_err)?;
    let columns = pipeline
        .feature_names()
        .iter()
        .map(|name| {
            frame
                .column_names()
                .iter()
                .position(|c| *c == name.as_str())
                .ok_or_else(|| Error::Explainability(format!("feature `{name}` is not in the frame")))
        })
        .collect::<Result<Vec<usize>>>()?;

    progress.set_length(columns.len() as u64);
    let mut importances = pipeline
        .feature_names()
        .par_iter()
        .zip(columns.par_iter())
        .enumerate()
        .progress_with(progress.clone())
        .map(|(j, (name, &column))| {
            let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(j as u64));
            let mut drops = Vec::with_capacity(options.n_repeats);
            for _ in 0..options.n_repeats {
                let mut permutation: Vec<usize> = (0..n).collect();
                permutation.shuffle(&mut rng);
                let shuffled = frame
                    .with_permuted_column(column, &permutation)
                    .map_err(explain_err)?;
                let permuted = accuracy(pipeline, &shuffled, labels, options.threshold)
                    .map_err(explain_err)?;
                drops.push(baseline - permuted);
            }
            let mean = drops.iter().sum::<f64>() / drops.len() as f64;
            let variance = drops.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / drops.len() as f64;
            Ok(FeatureImportance {
                feature: name.clone(),
                mean,
                std: variance.sqrt(),
                drops,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    progress.finish_and_clear();

    rank_importances(&mut importances);
    Ok(importances)
}

/// Stable sort by mean importance, descending.
pub fn rank_importances(importances: &mut [FeatureImportance]) {
    importances.sort_by(|a, b| b.mean.total_cmp(&a.mean));
}
