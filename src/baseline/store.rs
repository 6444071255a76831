use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::baseline::{BaselineDistribution, ColumnRef, DataLoadError};

/// Read-only holder of the baseline loaded at startup.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    source: Option<PathBuf>,
    distribution: Arc<BaselineDistribution>,
}

impl BaselineStore {
    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        let file = File::open(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => DataLoadError::Missing {
                path: path.to_path_buf(),
            },
            _ => DataLoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let distribution = read_delimited(file)?;
        info!(
            "loaded baseline {} ({} rows, columns: {})",
            path.display(),
            distribution.rows(),
            distribution.column_names().join(", ")
        );
        Ok(Self {
            source: Some(path.to_path_buf()),
            distribution: Arc::new(distribution),
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataLoadError> {
        Ok(Self::from_distribution(read_delimited(reader)?))
    }

    pub fn from_distribution(distribution: BaselineDistribution) -> Self {
        Self {
            source: None,
            distribution: Arc::new(distribution),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn distribution(&self) -> &BaselineDistribution {
        &self.distribution
    }

    pub fn column(&self, column: &ColumnRef) -> Result<&[f64], DataLoadError> {
        self.distribution.column(column)
    }
}

/// Parses a header-first comma-separated table where every cell is numeric.
pub fn read_delimited<R: Read>(reader: R) -> Result<BaselineDistribution, DataLoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(malformed)?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(DataLoadError::Empty);
    }
    let columns = headers.iter().map(str::to_string).collect::<Vec<_>>();
    let mut values = vec![Vec::new(); columns.len()];

    for record in csv_reader.records() {
        let record = record.map_err(malformed)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        for (idx, raw) in record.iter().enumerate() {
            let parsed = raw.parse::<f64>().ok().filter(|v| v.is_finite());
            let Some(value) = parsed else {
                return Err(DataLoadError::NonNumeric {
                    line,
                    column: columns[idx].clone(),
                    value: raw.to_string(),
                });
            };
            values[idx].push(value);
        }
    }

    BaselineDistribution::new(columns, values)
}

fn malformed(error: csv::Error) -> DataLoadError {
    let line = error.position().map(|p| p.line()).unwrap_or_default();
    DataLoadError::Malformed {
        line,
        message: error.to_string(),
    }
}
