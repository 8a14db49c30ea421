//! Pipeline configuration shared by the train, score and explain stages.
//!
//! The document is YAML. Paths are used as written, so relative paths
//! resolve against the working directory of the invoking process.

mod loader;

pub use loader::{load_config, parse_config, write_default_config, DEFAULT_CONFIG_PATH, DEFAULT_CONFIG_YAML};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::errors::{Error, Result};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Artifact locations
    pub paths: PathsConfig,

    /// Label column name in the dataset
    pub target: String,

    /// Seed for the split, the boosted ensembles and permutation importance
    pub seed: u64,

    /// Held-out fraction of rows, exclusive range (0, 1)
    pub test_size: f64,

    /// Classifier selection and hyperparameters
    pub model: ModelConfig,

    /// Insights engine options
    #[serde(default)]
    pub insights: InsightsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub data: PathBuf,
    pub model: PathBuf,
    pub predictions: PathBuf,
    pub metrics: PathBuf,
    pub importance_plot: PathBuf,
}

/// Requested classifier family.
///
/// The requested type is not necessarily the one that trains: see
/// [`crate::model::ModelStrategy::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    #[serde(alias = "logistic_regression", alias = "logistic")]
    Linear,
    #[serde(alias = "gradient_boosting", alias = "gbt")]
    BoostedTree,
    #[serde(alias = "xgboost", alias = "hist_gradient_boosting")]
    AltBoostedTree,
}

impl Default for ModelType {
    fn default() -> Self {
        Self::BoostedTree
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(rename = "type")]
    pub kind: ModelType,

    /// Hyperparameters passed through to the selected classifier
    #[serde(default)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Shuffles per feature in permutation importance
    #[serde(default = "default_n_repeats")]
    pub n_repeats: usize,

    /// Bars drawn in the importance chart
    #[serde(default = "default_plot_top")]
    pub plot_top: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            n_repeats: default_n_repeats(),
            plot_top: default_plot_top(),
        }
    }
}

pub fn default_n_repeats() -> usize {
    5
}

pub fn default_plot_top() -> usize {
    15
}

impl PipelineConfig {
    /// Check value ranges serde cannot express, naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("paths.data", &self.paths.data),
            ("paths.model", &self.paths.model),
            ("paths.predictions", &self.paths.predictions),
            ("paths.metrics", &self.paths.metrics),
            ("paths.importance_plot", &self.paths.importance_plot),
        ];
        if let Some((key, _)) = paths.iter().find(|(_, p)| p.as_os_str().is_empty()) {
            return Err(Error::config_key(*key, "path must not be empty"));
        }

        if self.target.trim().is_empty() {
            return Err(Error::config_key("target", "label column name must not be empty"));
        }

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(Error::config_key(
                "test_size",
                format!("expected a fraction in (0, 1), got {}", self.test_size),
            ));
        }

        if self.insights.n_repeats == 0 {
            return Err(Error::config_key("insights.n_repeats", "must be at least 1"));
        }

        if self.insights.plot_top == 0 {
            return Err(Error::config_key("insights.plot_top", "must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineConfig {
        parse_config(DEFAULT_CONFIG_YAML).unwrap()
    }

    #[test]
    fn test_default_template_is_valid() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.kind, ModelType::BoostedTree);
        assert_eq!(config.insights.n_repeats, 5);
    }

    #[test]
    fn test_test_size_out_of_range() {
        let mut config = sample();
        config.test_size = 1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("`test_size`"));
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let mut config = sample();
        config.paths.metrics = PathBuf::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("`paths.metrics`"));
    }

    #[test]
    fn test_model_type_aliases() {
        let parsed: ModelType = serde_yaml::from_str("xgboost").unwrap();
        assert_eq!(parsed, ModelType::AltBoostedTree);
        let parsed: ModelType = serde_yaml::from_str("logistic_regression").unwrap();
        assert_eq!(parsed, ModelType::Linear);
        let parsed: ModelType = serde_yaml::from_str("boosted-tree").unwrap();
        assert_eq!(parsed, ModelType::BoostedTree);
    }
}
