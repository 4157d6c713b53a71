//! Error types for consumption curves and their storage.

use std::path::PathBuf;
use thiserror::Error;

/// A consumption curve that cannot serve as a reference lap.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    #[error("Curve has {count} rows, at least {min} required")]
    TooFewRows { count: usize, min: usize },

    #[error("Terminal used amount {terminal} is below the preceding amount {preceding}")]
    DecreasingTotal { terminal: f64, preceding: f64 },

    #[error("Row {row} at position {position} precedes the row before it")]
    UnsortedPosition { row: usize, position: f64 },

    #[error("Row {row} contains a non-finite value")]
    NonFinite { row: usize },

    #[error("Terminal row carries no lap time")]
    MissingLapTime,
}

/// Errors raised while reading or writing persisted curves.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read curve file {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write curve file {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path:?}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed row {line} in {path:?}: {reason}")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Invalid curve in {path:?}: {source}")]
    InvalidCurve {
        path: PathBuf,
        #[source]
        source: CurveError,
    },

    #[error("Curve with {rows} rows is too short to persist")]
    TooShortToSave { rows: usize },
}

impl StorageError {
    /// True when the file simply does not exist yet.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            Self::ReadFailed { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }

    pub fn malformed_row(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
