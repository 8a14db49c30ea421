//! Raw feature frames and the preprocessing transform.
//!
//! A [`FeatureFrame`] holds the model inputs column by column, before any
//! encoding. Permutation importance shuffles these raw columns, so a
//! categorical feature is permuted as one unit rather than as its one-hot
//! indicators.

pub mod encoding;

pub use encoding::{ColumnTransformer, Matrix, OneHotEncoder, StandardScaler};

use crate::data::{CATEGORICAL_FEATURES, NUMERICAL_FEATURES};
use crate::errors::{Error, Result};

/// The fixed feature set split into its two branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
}

impl FeatureSet {
    /// `module`, `environment` and the thirteen numeric release signals.
    pub fn release_signals() -> Self {
        Self {
            categorical: CATEGORICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
            numerical: NUMERICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Feature names in consumption order: categorical first.
    pub fn names(&self) -> Vec<String> {
        self.categorical
            .iter()
            .chain(self.numerical.iter())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Categorical(Vec<String>),
    Numerical(Vec<f64>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Categorical(v) => v.len(),
            Self::Numerical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reorder values so that row `i` takes the value at `order[i]`.
    fn reordered(&self, order: &[usize]) -> Self {
        match self {
            Self::Categorical(v) => Self::Categorical(order.iter().map(|&i| v[i].clone()).collect()),
            Self::Numerical(v) => Self::Numerical(order.iter().map(|&i| v[i]).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: ColumnValues,
}

/// Column-major table of raw model inputs. All columns have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<FeatureColumn>,
    rows: usize,
}

impl FeatureFrame {
    pub fn new(columns: Vec<FeatureColumn>) -> Result<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != rows) {
            return Err(Error::DataSchema(format!(
                "column `{}` has {} values, expected {rows}",
                bad.name,
                bad.values.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn categorical(&self, name: &str) -> Result<&[String]> {
        match self.column(name).map(|c| &c.values) {
            Some(ColumnValues::Categorical(v)) => Ok(v.as_slice()),
            Some(ColumnValues::Numerical(_)) => Err(Error::DataSchema(format!(
                "column `{name}` is numeric, expected categorical"
            ))),
            None => Err(Error::missing_column(name)),
        }
    }

    pub fn numerical(&self, name: &str) -> Result<&[f64]> {
        match self.column(name).map(|c| &c.values) {
            Some(ColumnValues::Numerical(v)) => Ok(v.as_slice()),
            Some(ColumnValues::Categorical(_)) => Err(Error::DataSchema(format!(
                "column `{name}` is categorical, expected numeric"
            ))),
            None => Err(Error::missing_column(name)),
        }
    }

    /// Subset of rows, in the order given.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| FeatureColumn {
                    name: c.name.clone(),
                    values: c.values.reordered(rows),
                })
                .collect(),
            rows: rows.len(),
        }
    }

    /// Copy of the frame with column `index` reordered by `permutation`.
    pub fn with_permuted_column(&self, index: usize, permutation: &[usize]) -> Result<Self> {
        if permutation.len() != self.rows {
            return Err(Error::DataSchema(format!(
                "permutation of length {} for a frame of {} rows",
                permutation.len(),
                self.rows
            )));
        }
        let mut frame = self.clone();
        let column = frame.columns.get_mut(index).ok_or_else(|| {
            Error::DataSchema(format!("feature index {index} out of range"))
        })?;
        column.values = column.values.reordered(permutation);
        Ok(frame)
    }
}
