// Export modules for library usage
pub mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod errors;
pub mod features;
pub mod insights;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod scoring;
pub mod training;

// Re-export commonly used types
pub use crate::config::{load_config, ModelConfig, ModelType, PipelineConfig};

pub use crate::data::{generate_releases, load_table, Labels, ReleaseRecord, ReleaseTable};

pub use crate::errors::{Error, Result};

pub use crate::model::ModelStrategy;

pub use crate::pipeline::{build_pipeline, FittedPipeline, PipelineSpec};

pub use crate::training::{train_pipeline, EvaluationMetrics, TrainingOutcome};

pub use crate::scoring::{rank, run_scoring, score_releases, top_k, Prediction};

pub use crate::insights::{
    permutation_importance, run_insights, summarize, FeatureImportance, InsightSummary,
    InsightsOptions, InsightsReport,
};
