//! Loading release logs into identifier, feature and label columns.

use std::collections::HashSet;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use super::{
    ReleaseRecord, DATETIME_FORMAT, ENVIRONMENT, META_COLUMNS, MODULE, RELEASE_DATETIME,
    RELEASE_ID,
};
use crate::errors::{ArtifactKind, Error, Result};
use crate::features::{ColumnValues, FeatureColumn, FeatureFrame, FeatureSet};

/// Identifier columns of one release, carried verbatim into predictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMeta {
    pub release_id: u64,
    pub release_datetime: String,
    pub module: String,
    pub environment: String,
}

/// A release log split into identifiers, raw features and optional labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseTable {
    pub meta: Vec<ReleaseMeta>,
    pub features: FeatureFrame,
    pub labels: Option<Vec<u8>>,
}

impl ReleaseTable {
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Labels, or a schema error naming `target` when the table has none.
    pub fn require_labels(&self, target: &str) -> Result<&[u8]> {
        self.labels
            .as_deref()
            .ok_or_else(|| Error::missing_column(target))
    }

    /// Build a table from in-memory records, with labels attached.
    pub fn from_records(records: &[ReleaseRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::DataSchema("release table is empty".into()));
        }
        let features = FeatureSet::release_signals();

        let mut columns = vec![
            FeatureColumn {
                name: features.categorical[0].clone(),
                values: ColumnValues::Categorical(records.iter().map(|r| r.module.clone()).collect()),
            },
            FeatureColumn {
                name: features.categorical[1].clone(),
                values: ColumnValues::Categorical(
                    records.iter().map(|r| r.environment.clone()).collect(),
                ),
            },
        ];
        let signals: Vec<[f64; 13]> = records.iter().map(ReleaseRecord::numeric_signals).collect();
        for (j, name) in features.numerical.iter().enumerate() {
            columns.push(FeatureColumn {
                name: name.clone(),
                values: ColumnValues::Numerical(signals.iter().map(|s| s[j]).collect()),
            });
        }

        let meta = records
            .iter()
            .map(|r| ReleaseMeta {
                release_id: r.release_id,
                release_datetime: r.release_datetime.format(DATETIME_FORMAT).to_string(),
                module: r.module.clone(),
                environment: r.environment.clone(),
            })
            .collect::<Vec<_>>();
        check_unique_ids(&meta)?;

        Ok(Self {
            meta,
            features: FeatureFrame::new(columns)?,
            labels: Some(records.iter().map(|r| r.deploy_failed).collect()),
        })
    }
}

/// How [`load_table`] treats the label column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Labels<'a> {
    /// The named column must exist and every cell must be a binary label.
    Required(&'a str),
    /// No label column is read, even when one is present.
    Ignore,
}

/// Load a release-log CSV. Extra columns are ignored.
pub fn load_table(path: &Path, labels: Labels<'_>) -> Result<ReleaseTable> {
    if !path.exists() {
        return Err(Error::not_found(ArtifactKind::Dataset, path));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let features = FeatureSet::release_signals();

    let index_of = |name: &str| headers.iter().position(|h| h.trim() == name);
    let require = |name: &str| index_of(name).ok_or_else(|| Error::missing_column(name));

    let meta_idx = META_COLUMNS
        .iter()
        .map(|c| require(*c))
        .collect::<Result<Vec<_>>>()?;
    let cat_idx = features
        .categorical
        .iter()
        .map(|c| require(c.as_str()))
        .collect::<Result<Vec<_>>>()?;
    let num_idx = features
        .numerical
        .iter()
        .map(|c| require(c.as_str()))
        .collect::<Result<Vec<_>>>()?;
    let label_col = match labels {
        Labels::Required(target) => Some((target, require(target)?)),
        Labels::Ignore => None,
    };

    let mut meta = Vec::new();
    let mut categorical: Vec<Vec<String>> = vec![Vec::new(); cat_idx.len()];
    let mut numerical: Vec<Vec<f64>> = vec![Vec::new(); num_idx.len()];
    let mut label_values = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        meta.push(parse_meta(&record, &meta_idx, row)?);
        for (values, (idx, name)) in categorical
            .iter_mut()
            .zip(cat_idx.iter().zip(&features.categorical))
        {
            values.push(cell(&record, *idx, name, row)?.to_string());
        }
        for (values, (idx, name)) in numerical
            .iter_mut()
            .zip(num_idx.iter().zip(&features.numerical))
        {
            values.push(parse_number(cell(&record, *idx, name, row)?, name, row)?);
        }
        if let Some((name, idx)) = label_col {
            label_values.push(parse_label(cell(&record, idx, name, row)?, name, row)?);
        }
    }

    if meta.is_empty() {
        return Err(Error::DataSchema(format!(
            "release table {} has no rows",
            path.display()
        )));
    }
    check_unique_ids(&meta)?;

    let columns = features
        .categorical
        .iter()
        .zip(categorical)
        .map(|(name, values)| FeatureColumn {
            name: name.clone(),
            values: ColumnValues::Categorical(values),
        })
        .chain(
            features
                .numerical
                .iter()
                .zip(numerical)
                .map(|(name, values)| FeatureColumn {
                    name: name.clone(),
                    values: ColumnValues::Numerical(values),
                }),
        )
        .collect();

    debug!(path = %path.display(), rows = meta.len(), labelled = label_col.is_some(), "loaded release table");
    Ok(ReleaseTable {
        meta,
        features: FeatureFrame::new(columns)?,
        labels: label_col.map(|_| label_values),
    })
}

/// Trimmed cell value; empty cells are schema errors, rows are 1-based.
fn cell<'r>(record: &'r StringRecord, idx: usize, column: &str, row: usize) -> Result<&'r str> {
    let value = record.get(idx).map(str::trim).unwrap_or("");
    if value.is_empty() {
        return Err(Error::DataSchema(format!(
            "missing value in column `{column}` at row {}",
            row + 1
        )));
    }
    Ok(value)
}

fn parse_meta(record: &StringRecord, idx: &[usize], row: usize) -> Result<ReleaseMeta> {
    let raw_id = cell(record, idx[0], RELEASE_ID, row)?;
    let release_id = raw_id.parse::<u64>().map_err(|_| {
        Error::DataSchema(format!(
            "column `{RELEASE_ID}` at row {}: `{raw_id}` is not a non-negative integer",
            row + 1
        ))
    })?;
    Ok(ReleaseMeta {
        release_id,
        // Kept verbatim; only presence is checked.
        release_datetime: cell(record, idx[1], RELEASE_DATETIME, row)?.to_string(),
        module: cell(record, idx[2], MODULE, row)?.to_string(),
        environment: cell(record, idx[3], ENVIRONMENT, row)?.to_string(),
    })
}

fn parse_number(raw: &str, column: &str, row: usize) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::DataSchema(format!(
            "column `{column}` at row {}: `{raw}` is not a finite number",
            row + 1
        ))),
    }
}

fn parse_label(raw: &str, column: &str, row: usize) -> Result<u8> {
    match raw.to_ascii_lowercase().as_str() {
        "0" | "0.0" | "false" => Ok(0),
        "1" | "1.0" | "true" => Ok(1),
        _ => Err(Error::DataSchema(format!(
            "column `{column}` at row {}: `{raw}` is not a binary label",
            row + 1
        ))),
    }
}

fn check_unique_ids(meta: &[ReleaseMeta]) -> Result<()> {
    let mut seen = HashSet::with_capacity(meta.len());
    for m in meta {
        if !seen.insert(m.release_id) {
            return Err(Error::DataSchema(format!(
                "duplicate `{RELEASE_ID}` {}",
                m.release_id
            )));
        }
    }
    Ok(())
}
