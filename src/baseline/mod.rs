pub mod store;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("baseline source not found: {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed reading baseline {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("baseline source is empty")]
    Empty,
    #[error("malformed baseline at line {line}: {message}")]
    Malformed { line: u64, message: String },
    #[error("non-numeric value {value:?} in column {column} at line {line}")]
    NonNumeric {
        line: u64,
        column: String,
        value: String,
    },
    #[error("baseline has no column {0}")]
    UnknownColumn(ColumnRef),
}

/// Points at one baseline column either by header name or by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(idx) => write!(f, "#{idx}"),
            Self::Name(name) => write!(f, "{name:?}"),
        }
    }
}

/// Reference samples, stored column-major. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineDistribution {
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl BaselineDistribution {
    pub fn new(columns: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self, DataLoadError> {
        if columns.is_empty() || values.first().map(Vec::is_empty).unwrap_or(true) {
            return Err(DataLoadError::Empty);
        }
        if columns.len() != values.len() {
            return Err(DataLoadError::Malformed {
                line: 1,
                message: format!(
                    "{} column names for {} columns of data",
                    columns.len(),
                    values.len()
                ),
            });
        }
        let rows = values[0].len();
        if let Some((idx, _)) = values.iter().enumerate().find(|(_, col)| col.len() != rows) {
            return Err(DataLoadError::Malformed {
                line: 1,
                message: format!("column {} has a different row count", columns[idx]),
            });
        }
        Ok(Self { columns, values })
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> usize {
        self.values[0].len()
    }

    pub fn column(&self, column: &ColumnRef) -> Result<&[f64], DataLoadError> {
        let idx = match column {
            ColumnRef::Index(idx) => Some(*idx),
            ColumnRef::Name(name) => self.columns.iter().position(|c| c == name),
        };
        idx.and_then(|idx| self.values.get(idx))
            .map(Vec::as_slice)
            .ok_or_else(|| DataLoadError::UnknownColumn(column.clone()))
    }

    pub fn summarize(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(name, values)| {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                ColumnSummary {
                    name: name.clone(),
                    count: values.len(),
                    min,
                    max,
                    mean,
                }
            })
            .collect()
    }
}
