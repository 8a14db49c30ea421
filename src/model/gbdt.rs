//! Gradient-boosted regression trees on binary log-loss.
//!
//! Starts from the prior log-odds and adds one exact CART tree per round,
//! fitted to the negative gradient `y - p` with Newton leaf values.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{fit_exact, ExactTreeLimits, RegressionTree};
use super::{sigmoid, Hyperparameters};
use crate::errors::{Error, Result};
use crate::features::Matrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GbtParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn without replacement for each tree.
    pub subsample: f64,
    pub random_state: Option<u64>,
}

impl Default for GbtParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: None,
        }
    }
}

impl Hyperparameters for GbtParams {
    const KNOWN: &'static [&'static str] = &[
        "n_estimators",
        "learning_rate",
        "max_depth",
        "min_samples_split",
        "min_samples_leaf",
        "subsample",
        "random_state",
    ];

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::config_key("model.params.n_estimators", "must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::config_key("model.params.learning_rate", "must be positive"));
        }
        if self.min_samples_split < 2 {
            return Err(Error::config_key("model.params.min_samples_split", "must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(Error::config_key("model.params.min_samples_leaf", "must be at least 1"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(Error::config_key("model.params.subsample", "must be in (0, 1]"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    pub fn fit(x: &Matrix, y: &[u8], params: &GbtParams) -> Result<Self> {
        let n = x.n_rows();
        let positives = y.iter().filter(|&&v| v == 1).count() as f64;
        let prior = positives / n as f64;
        if prior <= 0.0 || prior >= 1.0 {
            return Err(Error::Training("boosting needs both classes".into()));
        }
        let init = (prior / (1.0 - prior)).ln();

        let limits = ExactTreeLimits {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
        };
        let mut rng = StdRng::seed_from_u64(params.random_state.unwrap_or_default());
        let in_bag = ((params.subsample * n as f64) as usize).clamp(1, n);
        let all_rows: Vec<usize> = (0..n).collect();

        let mut raw = vec![init; n];
        let mut residuals = vec![0.0; n];
        let mut hessians = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                residuals[i] = f64::from(y[i]) - p;
                hessians[i] = p * (1.0 - p);
            }

            let rows = if in_bag < n {
                let mut sampled = index::sample(&mut rng, n, in_bag).into_vec();
                sampled.sort_unstable();
                sampled
            } else {
                all_rows.clone()
            };

            let tree = fit_exact(x, &residuals, &hessians, &rows, limits);
            for (i, row) in x.rows().enumerate() {
                raw[i] += params.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);
        }

        debug!(
            trees = trees.len(),
            init,
            learning_rate = params.learning_rate,
            "gradient boosting fitted"
        );
        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn raw_score(&self, row: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.init, |acc, tree| acc + self.learning_rate * tree.predict_row(row))
    }

    pub fn predict_proba(&self, x: &Matrix) -> Vec<f64> {
        x.rows().map(|row| sigmoid(self.raw_score(row))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Failure only when both signals are high.
    fn interaction_data() -> (Matrix, Vec<u8>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                let (a, b) = (f64::from(i), f64::from(j));
                rows.push(vec![a, b]);
                y.push(u8::from(i >= 3 && j >= 6));
            }
        }
        (Matrix::from_rows(&rows).unwrap(), y)
    }

    #[test]
    fn test_fits_interaction() {
        let (x, y) = interaction_data();
        let model = GradientBoostedTrees::fit(&x, &y, &GbtParams::default()).unwrap();
        let p = model.predict_proba(&x);
        let correct = p
            .iter()
            .zip(&y)
            .filter(|(p, &label)| u8::from(**p > 0.5) == label)
            .count();
        assert_eq!(correct, y.len());
    }

    #[test]
    fn test_single_round_starts_from_prior() {
        let x = Matrix::from_rows(&[vec![0.0], vec![0.0], vec![0.0], vec![0.0]]).unwrap();
        let y = [1, 0, 0, 0];
        let params = GbtParams {
            n_estimators: 1,
            ..GbtParams::default()
        };
        let model = GradientBoostedTrees::fit(&x, &y, &params).unwrap();
        // Constant features leave a single leaf at the optimum of the prior.
        let p = model.predict_proba(&x);
        assert!((p[0] - 0.25).abs() < 1e-9, "{p:?}");
    }

    #[test]
    fn test_same_seed_same_model_with_subsampling() {
        let (x, y) = interaction_data();
        let params = GbtParams {
            n_estimators: 10,
            subsample: 0.5,
            random_state: Some(3),
            ..GbtParams::default()
        };
        let a = GradientBoostedTrees::fit(&x, &y, &params).unwrap();
        let b = GradientBoostedTrees::fit(&x, &y, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_subsample_rejected() {
        let params = GbtParams {
            subsample: 1.5,
            ..GbtParams::default()
        };
        assert!(params.validate().is_err());
    }
}
