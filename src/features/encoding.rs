//! One-hot encoding, standardization and their composition.
//!
//! All transforms are fitted on training rows only and are serializable so
//! they travel inside the fitted pipeline artifact.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{FeatureFrame, FeatureSet};
use crate::errors::{Error, Result};

/// Dense row-major design matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl Matrix {
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            data: vec![0.0; n_rows * n_cols],
            n_rows,
            n_cols,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != n_cols) {
            return Err(Error::DataSchema("matrix rows have unequal length".into()));
        }
        Ok(Self {
            data: rows.iter().flatten().copied().collect(),
            n_rows: rows.len(),
            n_cols,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n_cols + j]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.n_cols + j] = value;
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.n_cols.max(1)).take(self.n_rows)
    }
}

/// One-hot encoder that ignores unknown categories.
///
/// A category not seen during `fit` encodes as an all-zero block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(frame: &FeatureFrame, columns: &[String]) -> Result<Self> {
        let categories = columns
            .iter()
            .map(|name| {
                let values = frame.categorical(name)?;
                let unique: BTreeSet<&String> = values.iter().collect();
                Ok(unique.into_iter().cloned().collect())
            })
            .collect::<Result<Vec<Vec<String>>>>()?;
        Ok(Self {
            columns: columns.to_vec(),
            categories,
        })
    }

    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.categories[i].as_slice())
    }

    /// Output column names, `<column>_<category>`.
    pub fn output_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, cats)| cats.iter().map(move |c| format!("{column}_{c}")))
            .collect()
    }

    fn transform_into(&self, frame: &FeatureFrame, out: &mut Matrix, offset: usize) -> Result<()> {
        let mut base = offset;
        for (column, cats) in self.columns.iter().zip(&self.categories) {
            let values = frame.categorical(column)?;
            for (i, value) in values.iter().enumerate() {
                if let Ok(pos) = cats.binary_search(value) {
                    out.set(i, base + pos, 1.0);
                }
            }
            base += cats.len();
        }
        Ok(())
    }
}

/// Zero-mean, unit-variance scaling with population statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(frame: &FeatureFrame, columns: &[String]) -> Result<Self> {
        let mut mean = Vec::with_capacity(columns.len());
        let mut scale = Vec::with_capacity(columns.len());
        for name in columns {
            let values = frame.numerical(name)?;
            let n = values.len() as f64;
            let mu = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / n;
            let sd = var.sqrt();
            mean.push(mu);
            // Constant columns pass through centred but unscaled.
            scale.push(if sd == 0.0 { 1.0 } else { sd });
        }
        Ok(Self {
            columns: columns.to_vec(),
            mean,
            scale,
        })
    }

    pub fn n_outputs(&self) -> usize {
        self.columns.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    fn transform_into(&self, frame: &FeatureFrame, out: &mut Matrix, offset: usize) -> Result<()> {
        for (j, name) in self.columns.iter().enumerate() {
            let values = frame.numerical(name)?;
            for (i, v) in values.iter().enumerate() {
                out.set(i, offset + j, (v - self.mean[j]) / self.scale[j]);
            }
        }
        Ok(())
    }
}

/// Categorical and numeric branches side by side: one-hot block first,
/// scaled numeric block second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    encoder: OneHotEncoder,
    scaler: StandardScaler,
}

impl ColumnTransformer {
    pub fn fit(frame: &FeatureFrame, features: &FeatureSet) -> Result<Self> {
        if frame.n_rows() == 0 {
            return Err(Error::Training("cannot fit preprocessing on zero rows".into()));
        }
        Ok(Self {
            encoder: OneHotEncoder::fit(frame, &features.categorical)?,
            scaler: StandardScaler::fit(frame, &features.numerical)?,
        })
    }

    pub fn n_outputs(&self) -> usize {
        self.encoder.n_outputs() + self.scaler.n_outputs()
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn output_names(&self) -> Vec<String> {
        let mut names = self.encoder.output_names();
        names.extend(self.scaler.columns.iter().cloned());
        names
    }

    pub fn transform(&self, frame: &FeatureFrame) -> Result<Matrix> {
        let mut out = Matrix::zeros(frame.n_rows(), self.n_outputs());
        self.encoder.transform_into(frame, &mut out, 0)?;
        self.scaler
            .transform_into(frame, &mut out, self.encoder.n_outputs())?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ColumnValues, FeatureColumn};

    fn frame(modules: &[&str], commits: &[f64]) -> FeatureFrame {
        FeatureFrame::new(vec![
            FeatureColumn {
                name: "module".into(),
                values: ColumnValues::Categorical(modules.iter().map(|s| s.to_string()).collect()),
            },
            FeatureColumn {
                name: "commits".into(),
                values: ColumnValues::Numerical(commits.to_vec()),
            },
        ])
        .unwrap()
    }

    fn feature_set() -> FeatureSet {
        FeatureSet {
            categorical: vec!["module".into()],
            numerical: vec!["commits".into()],
        }
    }

    #[test]
    fn test_one_hot_sorted_categories() {
        let train = frame(&["payments", "core-banking", "payments"], &[1.0, 2.0, 3.0]);
        let encoder = OneHotEncoder::fit(&train, &["module".to_string()]).unwrap();
        assert_eq!(
            encoder.output_names(),
            vec!["module_core-banking", "module_payments"]
        );
    }

    #[test]
    fn test_unknown_category_encodes_as_zeros() {
        let train = frame(&["payments", "core-banking"], &[1.0, 3.0]);
        let transformer = ColumnTransformer::fit(&train, &feature_set()).unwrap();
        let unseen = frame(&["mainframe"], &[2.0]);
        let matrix = transformer.transform(&unseen).unwrap();
        assert_eq!(matrix.row(0), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scaler_uses_training_statistics() {
        let train = frame(&["a", "a", "a", "a"], &[2.0, 4.0, 4.0, 6.0]);
        let transformer = ColumnTransformer::fit(&train, &feature_set()).unwrap();
        assert_eq!(transformer.scaler().mean(), &[4.0]);
        let expected_sd = (2.0f64).sqrt();
        assert!((transformer.scaler().scale()[0] - expected_sd).abs() < 1e-12);

        let matrix = transformer.transform(&frame(&["a"], &[8.0])).unwrap();
        assert!((matrix.get(0, 1) - 4.0 / expected_sd).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_is_not_divided_by_zero() {
        let train = frame(&["a", "b"], &[5.0, 5.0]);
        let transformer = ColumnTransformer::fit(&train, &feature_set()).unwrap();
        let matrix = transformer.transform(&train).unwrap();
        assert_eq!(matrix.get(0, 2), 0.0);
    }

    #[test]
    fn test_missing_column_fails_transform() {
        let train = frame(&["a", "b"], &[1.0, 2.0]);
        let transformer = ColumnTransformer::fit(&train, &feature_set()).unwrap();
        let other = FeatureFrame::new(vec![FeatureColumn {
            name: "module".into(),
            values: ColumnValues::Categorical(vec!["a".into()]),
        }])
        .unwrap();
        assert!(matches!(
            transformer.transform(&other),
            Err(Error::DataSchema(_))
        ));
    }
}
