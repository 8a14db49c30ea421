//! Shared error types for the release-risk pipeline.
//!
//! Every stage returns [`Result`]. Configuration and schema problems are
//! fatal and name the offending key or column. Explainability and chart
//! failures are recoverable: the insights run reports them as a notice and
//! carries on with predictions and the summary.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Persisted artifacts the stages exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Dataset,
    Model,
    Predictions,
    Metrics,
    Config,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dataset => "dataset",
            Self::Model => "model",
            Self::Predictions => "predictions",
            Self::Metrics => "metrics",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

/// Main error type for deployrisk operations
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration
    #[error("configuration error{}: {message}", key_suffix(.key))]
    Configuration {
        key: Option<String>,
        message: String,
    },

    /// Required column absent, wrong type, missing value or empty table
    #[error("data schema error: {0}")]
    DataSchema(String),

    /// A required artifact does not exist on disk
    #[error("{kind} artifact not found: {}", .path.display())]
    ArtifactNotFound { kind: ArtifactKind, path: PathBuf },

    /// An artifact exists but cannot be decoded
    #[error("corrupt artifact {}: {message}", .path.display())]
    ArtifactCorrupt { path: PathBuf, message: String },

    /// Permutation importance could not be computed
    #[error("explainability computation failed: {0}")]
    Explainability(String),

    /// Training input cannot produce a model
    #[error("training error: {0}")]
    Training(String),

    /// Evaluation metrics are undefined for the given partition
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Importance chart could not be rendered
    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_ref()
        .map(|k| format!(" at `{k}`"))
        .unwrap_or_default()
}

impl Error {
    /// Configuration error tied to a dotted config key.
    pub fn config_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: Some(key.into()),
            message: message.into(),
        }
    }

    /// Configuration error without a specific key.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            key: None,
            message: message.into(),
        }
    }

    pub fn missing_column(column: &str) -> Self {
        Self::DataSchema(format!("required column `{column}` is missing"))
    }

    pub fn not_found(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self::ArtifactNotFound {
            kind,
            path: path.into(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArtifactCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Recoverable errors degrade to a notice instead of aborting a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Explainability(_) | Self::Render(_))
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_key() {
        let err = Error::config_key("paths.model", "must not be empty");
        assert_eq!(
            err.to_string(),
            "configuration error at `paths.model`: must not be empty"
        );
    }

    #[test]
    fn test_missing_column_message() {
        let err = Error::missing_column("test_coverage");
        assert!(err.to_string().contains("`test_coverage`"));
    }

    #[test]
    fn test_only_insight_failures_are_recoverable() {
        assert!(Error::Explainability("boom".into()).is_recoverable());
        assert!(Error::Render("no font".into()).is_recoverable());
        assert!(!Error::DataSchema("bad".into()).is_recoverable());
        assert!(!Error::not_found(ArtifactKind::Model, "m.bin").is_recoverable());
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found(ArtifactKind::Model, "models/m.bin");
        assert_eq!(err.to_string(), "model artifact not found: models/m.bin");
    }
}
