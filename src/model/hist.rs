//! Histogram-binned second-order boosting.
//!
//! Every feature is bucketed once into at most `max_bin` bins. Trees are
//! grown depth-first on per-bin gradient and hessian sums with gain
//!
//! ```text
//! gain = 0.5 * (GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)) - γ
//! ```
//!
//! and leaf weight `-G / (H + λ)`, scaled by the learning rate.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{RegressionTree, TreeNode};
use super::{sigmoid, Hyperparameters};
use crate::errors::{Error, Result};
use crate::features::Matrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub reg_lambda: f64,
    pub gamma: f64,
    pub min_child_weight: f64,
    pub subsample: f64,
    pub max_bin: usize,
    pub random_state: Option<u64>,
}

impl Default for HistParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            max_bin: 256,
            random_state: None,
        }
    }
}

impl Hyperparameters for HistParams {
    const KNOWN: &'static [&'static str] = &[
        "n_estimators",
        "learning_rate",
        "max_depth",
        "reg_lambda",
        "gamma",
        "min_child_weight",
        "subsample",
        "max_bin",
        "random_state",
    ];

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::config_key("model.params.n_estimators", "must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::config_key("model.params.learning_rate", "must be positive"));
        }
        if !(self.reg_lambda >= 0.0) {
            return Err(Error::config_key("model.params.reg_lambda", "must be non-negative"));
        }
        if !(self.gamma >= 0.0) {
            return Err(Error::config_key("model.params.gamma", "must be non-negative"));
        }
        if !(self.min_child_weight >= 0.0) {
            return Err(Error::config_key("model.params.min_child_weight", "must be non-negative"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(Error::config_key("model.params.subsample", "must be in (0, 1]"));
        }
        if !(2..=u16::MAX as usize).contains(&self.max_bin) {
            return Err(Error::config_key("model.params.max_bin", "must be between 2 and 65535"));
        }
        Ok(())
    }
}

/// Sorted cut points per feature. Bin `b` holds values in
/// `(cuts[b-1], cuts[b]]`.
struct BinnedMatrix {
    cuts: Vec<Vec<f64>>,
    bins: Vec<u16>,
    n_cols: usize,
}

impl BinnedMatrix {
    fn build(x: &Matrix, max_bin: usize) -> Self {
        let n_cols = x.n_cols();
        let cuts: Vec<Vec<f64>> = (0..n_cols)
            .map(|j| {
                let mut values: Vec<f64> = (0..x.n_rows()).map(|i| x.get(i, j)).collect();
                values.sort_by(f64::total_cmp);
                values.dedup();
                cut_points(&values, max_bin)
            })
            .collect();

        let mut bins = Vec::with_capacity(x.n_rows() * n_cols);
        for row in x.rows() {
            for (j, value) in row.iter().enumerate() {
                bins.push(cuts[j].partition_point(|c| c < value) as u16);
            }
        }
        Self { cuts, bins, n_cols }
    }

    fn bin(&self, row: usize, feature: usize) -> usize {
        usize::from(self.bins[row * self.n_cols + feature])
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }
}

/// Midpoints between distinct values, or quantile cuts when there are
/// more distinct values than bins.
fn cut_points(distinct: &[f64], max_bin: usize) -> Vec<f64> {
    if distinct.len() <= max_bin {
        return distinct.windows(2).map(|w| w[0] / 2.0 + w[1] / 2.0).collect();
    }
    let mut cuts: Vec<f64> = (1..max_bin)
        .map(|k| distinct[k * distinct.len() / max_bin - 1])
        .collect();
    cuts.dedup();
    cuts
}

#[derive(Debug, Clone, Copy, Default)]
struct GradPair {
    g: f64,
    h: f64,
}

impl GradPair {
    fn add(&mut self, other: GradPair) {
        self.g += other.g;
        self.h += other.h;
    }
}

struct HistBuilder<'a> {
    binned: &'a BinnedMatrix,
    grads: &'a [GradPair],
    params: &'a HistParams,
    nodes: Vec<TreeNode>,
}

impl HistBuilder<'_> {
    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value: 0.0 });

        let mut total = GradPair::default();
        for &r in &rows {
            total.add(self.grads[r]);
        }

        let split = if depth < self.params.max_depth {
            self.best_split(&rows, total)
        } else {
            None
        };

        match split {
            Some((feature, bin)) => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                    rows.iter().partition(|&&r| self.binned.bin(r, feature) <= bin);
                let threshold = self.binned.cuts[feature][bin];
                let left = self.grow(left_rows, depth + 1);
                let right = self.grow(right_rows, depth + 1);
                self.nodes[id] = TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                };
            }
            None => {
                let weight = -total.g / (total.h + self.params.reg_lambda);
                self.nodes[id] = TreeNode::Leaf {
                    value: self.params.learning_rate * weight,
                };
            }
        }
        id
    }

    fn best_split(&self, rows: &[usize], total: GradPair) -> Option<(usize, usize)> {
        let parent = self.score(total.g, total.h);
        let mut best: Option<(usize, usize, f64)> = None;

        for feature in 0..self.binned.n_cols {
            let n_bins = self.binned.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut hist = vec![GradPair::default(); n_bins];
            for &r in rows {
                hist[self.binned.bin(r, feature)].add(self.grads[r]);
            }

            let mut left = GradPair::default();
            for (bin, pair) in hist.iter().enumerate().take(n_bins - 1) {
                left.add(*pair);
                let right = GradPair {
                    g: total.g - left.g,
                    h: total.h - left.h,
                };
                if left.h < self.params.min_child_weight || right.h < self.params.min_child_weight {
                    continue;
                }
                let gain = 0.5 * (self.score(left.g, left.h) + self.score(right.g, right.h) - parent)
                    - self.params.gamma;
                if gain > best.map_or(0.0, |b| b.2) {
                    best = Some((feature, bin, gain));
                }
            }
        }
        best.map(|(feature, bin, _)| (feature, bin))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistGradientBoosting {
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl HistGradientBoosting {
    pub fn fit(x: &Matrix, y: &[u8], params: &HistParams) -> Result<Self> {
        let n = x.n_rows();
        let binned = BinnedMatrix::build(x, params.max_bin);
        let mut rng = StdRng::seed_from_u64(params.random_state.unwrap_or_default());
        let in_bag = ((params.subsample * n as f64) as usize).clamp(1, n);

        let base_score = 0.0;
        let mut raw = vec![base_score; n];
        let mut grads = vec![GradPair::default(); n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grads[i] = GradPair {
                    g: p - f64::from(y[i]),
                    h: (p * (1.0 - p)).max(1e-16),
                };
            }
            let rows = if in_bag < n {
                let mut sampled = index::sample(&mut rng, n, in_bag).into_vec();
                sampled.sort_unstable();
                sampled
            } else {
                (0..n).collect()
            };

            let mut builder = HistBuilder {
                binned: &binned,
                grads: &grads,
                params,
                nodes: Vec::new(),
            };
            builder.grow(rows, 0);
            let tree = RegressionTree::from_nodes(builder.nodes);

            for (i, row) in x.rows().enumerate() {
                raw[i] += tree.predict_row(row);
            }
            trees.push(tree);
        }

        debug!(
            trees = trees.len(),
            leaves = trees.iter().map(RegressionTree::n_leaves).sum::<usize>(),
            "histogram boosting fitted"
        );
        Ok(Self { base_score, trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_proba(&self, x: &Matrix) -> Vec<f64> {
        x.rows()
            .map(|row| {
                let raw = self
                    .trees
                    .iter()
                    .fold(self.base_score, |acc, tree| acc + tree.predict_row(row));
                sigmoid(raw)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_points_between_distinct_values() {
        assert_eq!(cut_points(&[1.0, 2.0, 4.0], 256), vec![1.5, 3.0]);
        assert!(cut_points(&[7.0], 256).is_empty());
    }

    #[test]
    fn test_quantile_cuts_bounded_by_max_bin() {
        let distinct: Vec<f64> = (0..1000).map(f64::from).collect();
        let cuts = cut_points(&distinct, 16);
        assert_eq!(cuts.len(), 15);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_bins_agree_with_thresholds() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![4.0], vec![4.0]]).unwrap();
        let binned = BinnedMatrix::build(&x, 256);
        assert_eq!(binned.n_bins(0), 3);
        assert_eq!((0..4).map(|r| binned.bin(r, 0)).collect::<Vec<_>>(), vec![0, 1, 2, 2]);
        // Row goes left of cut b exactly when its bin is <= b.
        for r in 0..4 {
            for b in 0..2 {
                assert_eq!(binned.bin(r, 0) <= b, x.get(r, 0) <= binned.cuts[0][b]);
            }
        }
    }

    #[test]
    fn test_learns_threshold_rule() {
        let rows: Vec<Vec<f64>> = (0..60).map(|i| vec![f64::from(i), f64::from(i % 4)]).collect();
        let y: Vec<u8> = (0..60).map(|i| u8::from(i >= 35)).collect();
        let x = Matrix::from_rows(&rows).unwrap();
        let model = HistGradientBoosting::fit(&x, &y, &HistParams::default()).unwrap();
        let p = model.predict_proba(&x);
        assert!(p[0] < 0.1 && p[59] > 0.9, "{} {}", p[0], p[59]);
        assert_eq!(model.n_trees(), 100);
    }

    #[test]
    fn test_gamma_prunes_weak_splits() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<u8> = (0..20).map(|i| u8::from(i % 2 == 0)).collect();
        let x = Matrix::from_rows(&rows).unwrap();
        let params = HistParams {
            n_estimators: 1,
            gamma: 1e6,
            ..HistParams::default()
        };
        let model = HistGradientBoosting::fit(&x, &y, &params).unwrap();
        assert_eq!(model.trees[0].n_leaves(), 1);
    }
}
