//! Regression trees shared by both boosters.
//!
//! Nodes live in a flat arena with the root at index 0. A row goes left
//! when `row[feature] <= threshold`.

use serde::{Deserialize, Serialize};

use crate::features::Matrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub(crate) fn from_nodes(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], id: usize) -> usize {
            match nodes[id] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }
}

/// Growth limits of an exact CART tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExactTreeLimits {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

/// Least-squares tree on `residuals` with Newton leaf values
/// `sum(residual) / sum(hessian)`.
///
/// Splits maximise Friedman's improvement
/// `n_l * n_r * (mean_l - mean_r)^2 / n`. Thresholds sit halfway between
/// consecutive distinct values; on equal improvement the first candidate
/// in feature-then-value order wins.
pub(crate) fn fit_exact(
    x: &Matrix,
    residuals: &[f64],
    hessians: &[f64],
    rows: &[usize],
    limits: ExactTreeLimits,
) -> RegressionTree {
    let mut builder = ExactBuilder {
        x,
        residuals,
        hessians,
        limits,
        nodes: Vec::new(),
    };
    builder.grow(rows.to_vec(), 0);
    RegressionTree::from_nodes(builder.nodes)
}

struct ExactBuilder<'a> {
    x: &'a Matrix,
    residuals: &'a [f64],
    hessians: &'a [f64],
    limits: ExactTreeLimits,
    nodes: Vec<TreeNode>,
}

impl ExactBuilder<'_> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value: 0.0 });

        let splittable = depth < self.limits.max_depth
            && rows.len() >= self.limits.min_samples_split
            && rows.len() >= 2 * self.limits.min_samples_leaf;
        let best = if splittable { self.best_split(&rows) } else { None };

        match best {
            Some(split) => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .partition(|&&r| self.x.get(r, split.feature) <= split.threshold);
                let left = self.grow(left_rows, depth + 1);
                let right = self.grow(right_rows, depth + 1);
                self.nodes[id] = TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
            }
            None => {
                self.nodes[id] = TreeNode::Leaf {
                    value: self.newton_value(&rows),
                };
            }
        }
        id
    }

    fn newton_value(&self, rows: &[usize]) -> f64 {
        let numerator: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        let denominator: f64 = rows.iter().map(|&r| self.hessians[r]).sum();
        if denominator.abs() < 1e-150 {
            0.0
        } else {
            numerator / denominator
        }
    }

    fn best_split(&self, rows: &[usize]) -> Option<Candidate> {
        let n = rows.len();
        if n < 2 {
            return None;
        }
        let total: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        let mean = total / n as f64;
        let impurity = rows
            .iter()
            .map(|&r| (self.residuals[r] - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        if impurity <= f64::EPSILON {
            return None;
        }
        let min_leaf = self.limits.min_samples_leaf.max(1);
        let mut best: Option<Candidate> = None;
        let mut order = rows.to_vec();

        for feature in 0..self.x.n_cols() {
            order.copy_from_slice(rows);
            order.sort_by(|&a, &b| self.x.get(a, feature).total_cmp(&self.x.get(b, feature)));

            let mut left_sum = 0.0;
            for i in 0..n - 1 {
                left_sum += self.residuals[order[i]];
                let n_left = i + 1;
                let n_right = n - n_left;
                let here = self.x.get(order[i], feature);
                let next = self.x.get(order[i + 1], feature);
                if here == next || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let (nl, nr) = (n_left as f64, n_right as f64);
                let diff = left_sum / nl - (total - left_sum) / nr;
                let improvement = nl * nr * diff * diff / n as f64;
                if improvement > best.map_or(0.0, |b| b.improvement) {
                    best = Some(Candidate {
                        feature,
                        threshold: midpoint(here, next),
                        improvement,
                    });
                }
            }
        }
        best
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    let mid = a / 2.0 + b / 2.0;
    if mid == b {
        a
    } else {
        mid
    }
}
