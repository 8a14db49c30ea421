//! Predictions CSV artifact.

use std::path::Path;

use super::{is_ranked, Prediction};
use crate::errors::{ArtifactKind, Error, Result};
use crate::io;

pub fn write_predictions(path: &Path, predictions: &[Prediction]) -> Result<()> {
    io::ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for prediction in predictions {
        writer.serialize(prediction)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a predictions table, rejecting empty, out-of-range or unsorted data.
pub fn read_predictions(path: &Path) -> Result<Vec<Prediction>> {
    if !path.exists() {
        return Err(Error::not_found(ArtifactKind::Predictions, path));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let predictions = reader
        .deserialize()
        .collect::<std::result::Result<Vec<Prediction>, csv::Error>>()
        .map_err(|e| Error::corrupt(path, e.to_string()))?;

    if predictions.is_empty() {
        return Err(Error::DataSchema(format!(
            "predictions table {} is empty",
            path.display()
        )));
    }
    if let Some(bad) = predictions
        .iter()
        .find(|p| !(0.0..=1.0).contains(&p.risk_score))
    {
        return Err(Error::DataSchema(format!(
            "release {} has risk_score {} outside [0, 1]",
            bad.release_id, bad.risk_score
        )));
    }
    if !is_ranked(&predictions) {
        return Err(Error::DataSchema(
            "predictions are not sorted by descending risk_score".into(),
        ));
    }
    Ok(predictions)
}
