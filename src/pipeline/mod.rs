//! Preprocessing plus classifier as one trainable unit.
//!
//! [`build_pipeline`] turns the `model` config section into an unfitted
//! [`PipelineSpec`]; fitting it yields a [`FittedPipeline`], which is what
//! the trainer persists and every later stage loads.

mod artifact;

pub use artifact::{ARTIFACT_MAGIC, ARTIFACT_VERSION};

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::errors::{Error, Result};
use crate::features::{ColumnTransformer, FeatureFrame, FeatureSet};
use crate::model::{Classifier, ClassifierSpec, ModelStrategy};

/// An unfitted transform and classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSpec {
    features: FeatureSet,
    classifier: ClassifierSpec,
    strategy: ModelStrategy,
}

/// Build the unfitted pipeline for `model` together with the ordered
/// feature names it consumes.
///
/// The classifier strategy is resolved here, once.
pub fn build_pipeline(model: &ModelConfig, seed: u64) -> Result<(PipelineSpec, Vec<String>)> {
    let (strategy, classifier) = ClassifierSpec::from_config(model.kind, &model.params, seed)?;
    let features = FeatureSet::release_signals();
    let names = features.names();
    Ok((
        PipelineSpec {
            features,
            classifier,
            strategy,
        },
        names,
    ))
}

impl PipelineSpec {
    pub fn strategy(&self) -> ModelStrategy {
        self.strategy
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Fit the transform and the classifier on the same rows.
    pub fn fit(&self, frame: &FeatureFrame, labels: &[u8]) -> Result<FittedPipeline> {
        if frame.n_rows() != labels.len() {
            return Err(Error::Training(format!(
                "{} feature rows but {} labels",
                frame.n_rows(),
                labels.len()
            )));
        }
        let transform = ColumnTransformer::fit(frame, &self.features)?;
        let design = transform.transform(frame)?;
        debug!(
            rows = design.n_rows(),
            columns = design.n_cols(),
            "design matrix built"
        );
        let classifier = self.classifier.fit(&design, labels)?;
        info!(model = %classifier.strategy(), rows = frame.n_rows(), "pipeline fitted");

        Ok(FittedPipeline {
            feature_names: self.features.names(),
            transform,
            classifier,
        })
    }
}

/// Trained preprocessing and classifier, read-only after training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    feature_names: Vec<String>,
    transform: ColumnTransformer,
    classifier: Classifier,
}

impl FittedPipeline {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn strategy(&self) -> ModelStrategy {
        self.classifier.strategy()
    }

    pub fn transform(&self) -> &ColumnTransformer {
        &self.transform
    }

    /// Positive-class probability for every row of `frame`.
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        let design = self.transform.transform(frame)?;
        Ok(self.classifier.predict_proba(&design))
    }

    /// Persist as a versioned binary artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        artifact::write(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        artifact::read(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelType;
    use crate::data::generator::generate_releases;
    use crate::data::ReleaseTable;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn table(rows: usize, seed: u64) -> ReleaseTable {
        let anchor = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let records = generate_releases(rows, anchor, &mut StdRng::seed_from_u64(seed)).unwrap();
        ReleaseTable::from_records(&records).unwrap()
    }

    fn config(kind: ModelType) -> ModelConfig {
        ModelConfig {
            kind,
            params: BTreeMap::new(),
        }
    }

    #[test]
    fn test_feature_names_are_categorical_then_numeric() {
        let (spec, names) = build_pipeline(&config(ModelType::Linear), 1).unwrap();
        assert_eq!(spec.strategy(), ModelStrategy::Linear);
        assert_eq!(names.len(), 15);
        assert_eq!(&names[..2], &["module".to_string(), "environment".to_string()]);
    }

    #[test]
    fn test_fitted_scores_are_probabilities() {
        let data = table(120, 4);
        let (spec, _) = build_pipeline(&config(ModelType::Linear), 1).unwrap();
        let fitted = spec.fit(&data.features, data.labels.as_deref().unwrap()).unwrap();
        let scores = fitted.predict_proba(&data.features).unwrap();
        assert_eq!(scores.len(), 120);
        assert!(scores.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_boosted_fit_is_deterministic() {
        let data = table(80, 9);
        let labels = data.labels.as_deref().unwrap();
        let (spec, _) = build_pipeline(&config(ModelType::BoostedTree), 3).unwrap();
        let a = spec.fit(&data.features, labels).unwrap();
        let b = spec.fit(&data.features, labels).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_label_length_mismatch() {
        let data = table(20, 2);
        let (spec, _) = build_pipeline(&config(ModelType::Linear), 1).unwrap();
        assert!(matches!(
            spec.fit(&data.features, &[0, 1]),
            Err(Error::Training(_))
        ));
    }
}
