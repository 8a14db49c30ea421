//! Classifier families and the strategy that picks one.
//!
//! ```text
//!  model.type ──> ModelStrategy::resolve ──> ClassifierSpec ──fit──> Classifier
//!                  (capability check)         (typed params)          (serializable)
//! ```
//!
//! Strategy resolution happens once, when the pipeline is built. Asking
//! for the alternative booster in a build without the `hist-boost` feature
//! yields the exact gradient-boosted ensemble; the caller only sees the
//! difference through [`Classifier::strategy`].

pub mod gbdt;
#[cfg(feature = "hist-boost")]
pub mod hist;
pub mod logistic;
pub mod tree;

pub use gbdt::{GbtParams, GradientBoostedTrees};
#[cfg(feature = "hist-boost")]
pub use hist::{HistGradientBoosting, HistParams};
pub use logistic::{LogisticParams, LogisticRegression};
pub use tree::{RegressionTree, TreeNode};

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ModelType;
use crate::errors::{Error, Result};
use crate::features::Matrix;

/// Whether the alternative boosted-tree implementation is compiled in.
pub const fn alt_boost_available() -> bool {
    cfg!(feature = "hist-boost")
}

/// The classifier family that will actually train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelStrategy {
    Linear,
    BoostedTree,
    AltBoostedTree,
}

impl ModelStrategy {
    /// Map a requested model type to an available implementation.
    pub fn resolve(requested: ModelType) -> Self {
        Self::resolve_with(requested, alt_boost_available())
    }

    fn resolve_with(requested: ModelType, alt_available: bool) -> Self {
        match requested {
            ModelType::Linear => Self::Linear,
            ModelType::BoostedTree => Self::BoostedTree,
            ModelType::AltBoostedTree if alt_available => Self::AltBoostedTree,
            ModelType::AltBoostedTree => {
                debug!("alternative booster not compiled in, using gradient boosting");
                Self::BoostedTree
            }
        }
    }

    /// Algorithm name recorded in the metrics artifact.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Linear => "logistic_regression",
            Self::BoostedTree => "gradient_boosting",
            Self::AltBoostedTree => "hist_gradient_boosting",
        }
    }
}

impl fmt::Display for ModelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.algorithm())
    }
}

/// Typed hyperparameters of one classifier family.
pub trait Hyperparameters: DeserializeOwned + Default {
    /// Keys accepted under `model.params`.
    const KNOWN: &'static [&'static str];

    fn validate(&self) -> Result<()>;
}

/// Turn the raw `model.params` map into typed hyperparameters.
///
/// In strict mode an unknown key is a configuration error. Otherwise it is
/// dropped with a warning, which is what a fallback model does with keys
/// meant for the model it replaced.
pub fn parse_hyperparameters<P: Hyperparameters>(
    params: &BTreeMap<String, serde_yaml::Value>,
    strategy: ModelStrategy,
    strict: bool,
) -> Result<P> {
    let mut accepted = serde_yaml::Mapping::new();
    for (key, value) in params {
        if P::KNOWN.contains(&key.as_str()) {
            accepted.insert(serde_yaml::Value::String(key.clone()), value.clone());
        } else if strict {
            return Err(Error::config_key(
                format!("model.params.{key}"),
                format!("unsupported hyperparameter for {strategy}"),
            ));
        } else {
            warn!(key = %key, model = %strategy, "dropping hyperparameter the fallback model does not use");
        }
    }

    let parsed: P = serde_yaml::from_value(serde_yaml::Value::Mapping(accepted))
        .map_err(|e| Error::config_key("model.params", e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

/// An unfitted classifier with its hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierSpec {
    Logistic(LogisticParams),
    GradientBoosting(GbtParams),
    #[cfg(feature = "hist-boost")]
    HistBoosting(HistParams),
}

impl ClassifierSpec {
    /// Resolve the strategy for `requested` and parse its hyperparameters.
    ///
    /// `seed` fills `random_state` when the params leave it unset.
    pub fn from_config(
        requested: ModelType,
        params: &BTreeMap<String, serde_yaml::Value>,
        seed: u64,
    ) -> Result<(ModelStrategy, Self)> {
        let strategy = ModelStrategy::resolve(requested);
        let strict = strategy_matches(requested, strategy);

        let spec = match strategy {
            ModelStrategy::Linear => {
                Self::Logistic(parse_hyperparameters(params, strategy, strict)?)
            }
            ModelStrategy::BoostedTree => {
                let mut p: GbtParams = parse_hyperparameters(params, strategy, strict)?;
                p.random_state.get_or_insert(seed);
                Self::GradientBoosting(p)
            }
            #[cfg(feature = "hist-boost")]
            ModelStrategy::AltBoostedTree => {
                let mut p: HistParams = parse_hyperparameters(params, strategy, strict)?;
                p.random_state.get_or_insert(seed);
                Self::HistBoosting(p)
            }
            #[cfg(not(feature = "hist-boost"))]
            ModelStrategy::AltBoostedTree => {
                return Err(Error::config_key(
                    "model.type",
                    "alt-boosted-tree requires the hist-boost feature",
                ))
            }
        };

        debug!(requested = ?requested, resolved = %strategy, "classifier selected");
        Ok((strategy, spec))
    }

    pub fn strategy(&self) -> ModelStrategy {
        match self {
            Self::Logistic(_) => ModelStrategy::Linear,
            Self::GradientBoosting(_) => ModelStrategy::BoostedTree,
            #[cfg(feature = "hist-boost")]
            Self::HistBoosting(_) => ModelStrategy::AltBoostedTree,
        }
    }

    /// Fit on a preprocessed design matrix and 0/1 labels.
    pub fn fit(&self, x: &Matrix, y: &[u8]) -> Result<Classifier> {
        check_training_input(x, y)?;
        let fitted = match self {
            Self::Logistic(p) => Classifier::Logistic(LogisticRegression::fit(x, y, p)?),
            Self::GradientBoosting(p) => {
                Classifier::GradientBoosting(GradientBoostedTrees::fit(x, y, p)?)
            }
            #[cfg(feature = "hist-boost")]
            Self::HistBoosting(p) => Classifier::HistBoosting(HistGradientBoosting::fit(x, y, p)?),
        };
        Ok(fitted)
    }
}

fn strategy_matches(requested: ModelType, strategy: ModelStrategy) -> bool {
    matches!(
        (requested, strategy),
        (ModelType::Linear, ModelStrategy::Linear)
            | (ModelType::BoostedTree, ModelStrategy::BoostedTree)
            | (ModelType::AltBoostedTree, ModelStrategy::AltBoostedTree)
    )
}

fn check_training_input(x: &Matrix, y: &[u8]) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(Error::Training(format!(
            "{} feature rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    if y.is_empty() {
        return Err(Error::Training("no training rows".into()));
    }
    let positives = y.iter().filter(|&&v| v == 1).count();
    if positives == 0 || positives == y.len() {
        return Err(Error::Training(
            "training labels contain a single class".into(),
        ));
    }
    Ok(())
}

/// A fitted classifier producing positive-class probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classifier {
    Logistic(LogisticRegression),
    GradientBoosting(GradientBoostedTrees),
    #[cfg(feature = "hist-boost")]
    HistBoosting(HistGradientBoosting),
}

impl Classifier {
    pub fn predict_proba(&self, x: &Matrix) -> Vec<f64> {
        match self {
            Self::Logistic(m) => m.predict_proba(x),
            Self::GradientBoosting(m) => m.predict_proba(x),
            #[cfg(feature = "hist-boost")]
            Self::HistBoosting(m) => m.predict_proba(x),
        }
    }

    pub fn strategy(&self) -> ModelStrategy {
        match self {
            Self::Logistic(_) => ModelStrategy::Linear,
            Self::GradientBoosting(_) => ModelStrategy::BoostedTree,
            #[cfg(feature = "hist-boost")]
            Self::HistBoosting(_) => ModelStrategy::AltBoostedTree,
        }
    }
}

/// Numerically stable logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
