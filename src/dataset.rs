use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::DeckError;
use crate::models::StudentRecord;

/// Outcome of the single startup read. Chart builders check `records()`
/// and fall back to a placeholder when it is `None`.
#[derive(Debug)]
pub enum Dataset {
    Loaded {
        path: PathBuf,
        records: Vec<StudentRecord>,
    },
    Unavailable(DeckError),
}

impl Dataset {
    /// Reads the CSV once. Failure is logged here and kept, never retried.
    pub fn load(path: &Path) -> Self {
        match read_records(path) {
            Ok(records) => {
                info!(path = %path.display(), rows = records.len(), "dataset loaded");
                Dataset::Loaded {
                    path: path.to_path_buf(),
                    records,
                }
            }
            Err(err) => {
                error!("{err}");
                Dataset::Unavailable(err)
            }
        }
    }

    pub fn records(&self) -> Option<&[StudentRecord]> {
        match self {
            Dataset::Loaded { records, .. } => Some(records),
            Dataset::Unavailable(_) => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Dataset::Loaded { path, .. } => Some(path),
            Dataset::Unavailable(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DeckError> {
        match self {
            Dataset::Loaded { .. } => None,
            Dataset::Unavailable(err) => Some(err),
        }
    }
}

pub fn read_records(path: &Path) -> Result<Vec<StudentRecord>, DeckError> {
    let unavailable = |reason: String| DeckError::DatasetUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::Reader::from_path(path).map_err(|err| unavailable(err.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|err| unavailable(err.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(unavailable("file has no header row".to_string()));
    }

    let mut records = Vec::new();
    for result in reader.deserialize::<StudentRecord>() {
        let record = result.map_err(|err| unavailable(err.to_string()))?;
        records.push(record);
    }

    Ok(records)
}

/// Keeps the records that hold a value in every named column.
pub fn complete<'a>(records: &'a [StudentRecord], columns: &[&str]) -> Vec<&'a StudentRecord> {
    let kept: Vec<&StudentRecord> = records
        .iter()
        .filter(|record| record.has_all(columns))
        .collect();
    if kept.len() < records.len() {
        debug!(
            dropped = records.len() - kept.len(),
            ?columns,
            "excluded rows with missing fields"
        );
    }
    kept
}
