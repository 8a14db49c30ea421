//! L2-regularised logistic regression fitted by damped Newton steps.
//!
//! Minimises `0.5 * ||w||^2 + C * sum(logloss)`; the intercept is not
//! penalised.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{sigmoid, Hyperparameters};
use crate::errors::{Error, Result};
use crate::features::Matrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogisticParams {
    /// Inverse regularisation strength.
    #[serde(rename = "C", alias = "c")]
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 500,
            tol: 1e-6,
            fit_intercept: true,
        }
    }
}

impl Hyperparameters for LogisticParams {
    const KNOWN: &'static [&'static str] = &["C", "c", "max_iter", "tol", "fit_intercept"];

    fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(Error::config_key("model.params.C", "must be positive"));
        }
        if self.max_iter == 0 {
            return Err(Error::config_key("model.params.max_iter", "must be at least 1"));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(Error::config_key("model.params.tol", "must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    coef: Vec<f64>,
    intercept: f64,
}

const MAX_HALVINGS: usize = 40;

impl LogisticRegression {
    pub fn fit(x: &Matrix, y: &[u8], params: &LogisticParams) -> Result<Self> {
        let d = x.n_cols();
        // Weights followed by the intercept slot.
        let dim = if params.fit_intercept { d + 1 } else { d };
        let mut w = vec![0.0; dim];
        let mut objective = penalised_loss(x, y, &w, params);
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..params.max_iter {
            iterations = iter + 1;
            let (grad, hess) = gradient_and_hessian(x, y, &w, params);
            if grad.iter().fold(0.0f64, |m, g| m.max(g.abs())) < params.tol {
                converged = true;
                break;
            }
            let step = solve(hess, grad, dim).ok_or_else(|| {
                Error::Training("logistic regression Hessian is singular".into())
            })?;

            let mut scale = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_HALVINGS {
                let candidate: Vec<f64> = w.iter().zip(&step).map(|(wi, si)| wi - scale * si).collect();
                let value = penalised_loss(x, y, &candidate, params);
                if value <= objective {
                    w = candidate;
                    objective = value;
                    accepted = true;
                    break;
                }
                scale *= 0.5;
            }
            if !accepted {
                // No descent left at machine precision.
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                max_iter = params.max_iter,
                "logistic regression did not converge; consider raising max_iter"
            );
        }
        debug!(iterations, objective, "logistic regression fitted");

        let intercept = if params.fit_intercept { w[d] } else { 0.0 };
        w.truncate(d);
        Ok(Self { coef: w, intercept })
    }

    pub fn coef(&self) -> &[f64] {
        &self.coef
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn decision(&self, row: &[f64]) -> f64 {
        self.intercept + dot(&self.coef, row)
    }

    pub fn predict_proba(&self, x: &Matrix) -> Vec<f64> {
        x.rows().map(|row| sigmoid(self.decision(row))).collect()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn linear_term(x_row: &[f64], w: &[f64], fit_intercept: bool) -> f64 {
    let d = x_row.len();
    let z = dot(&w[..d], x_row);
    if fit_intercept {
        z + w[d]
    } else {
        z
    }
}

/// `log(1 + exp(z)) - y * z` without overflow.
fn logloss(z: f64, y: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p() - y * z
}

fn penalised_loss(x: &Matrix, y: &[u8], w: &[f64], params: &LogisticParams) -> f64 {
    let d = x.n_cols();
    let penalty = 0.5 * w[..d].iter().map(|v| v * v).sum::<f64>();
    let data: f64 = x
        .rows()
        .zip(y)
        .map(|(row, &label)| logloss(linear_term(row, w, params.fit_intercept), f64::from(label)))
        .sum();
    penalty + params.c * data
}

/// Gradient and row-major Hessian of the penalised loss.
fn gradient_and_hessian(
    x: &Matrix,
    y: &[u8],
    w: &[f64],
    params: &LogisticParams,
) -> (Vec<f64>, Vec<f64>) {
    let d = x.n_cols();
    let dim = w.len();
    let mut grad = vec![0.0; dim];
    let mut hess = vec![0.0; dim * dim];

    for (row, &label) in x.rows().zip(y) {
        let mu = sigmoid(linear_term(row, w, params.fit_intercept));
        let residual = params.c * (mu - f64::from(label));
        let weight = params.c * mu * (1.0 - mu);
        let feature = |j: usize| if j < d { row[j] } else { 1.0 };
        for j in 0..dim {
            let xj = feature(j);
            grad[j] += residual * xj;
            for k in j..dim {
                hess[j * dim + k] += weight * xj * feature(k);
            }
        }
    }
    for j in 0..d {
        grad[j] += w[j];
        hess[j * dim + j] += 1.0;
    }
    for j in 0..dim {
        for k in 0..j {
            hess[j * dim + k] = hess[k * dim + j];
        }
    }
    (grad, hess)
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<f64>, mut b: Vec<f64>, n: usize) -> Option<Vec<f64>> {
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i * n + col].abs().total_cmp(&a[j * n + col].abs()))?;
        if a[pivot * n + col].abs() < 1e-300 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap(col * n + k, pivot * n + k);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[row * n + col] / a[col * n + col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row * n + k] -= factor * a[col * n + k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut out = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row * n + k] * out[k]).sum();
        out[row] = (b[row] - tail) / a[row * n + row];
    }
    Some(out)
}
