//! Store error types.

use diagmerge_types::ResolveError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or writing a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}:{line}: {message}")]
    Parse {
        origin: String,
        line: usize,
        message: String,
    },

    #[error("XML error in {origin}: {source}")]
    Xml {
        origin: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("CSV error in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("{origin} has no {what}")]
    Missing { origin: String, what: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(origin: &str, line: usize, message: impl Into<String>) -> Self {
        StoreError::Parse {
            origin: origin.to_string(),
            line,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ResolveError {
    fn from(err: StoreError) -> Self {
        ResolveError::Store(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn read_file(path: &std::path::Path) -> StoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))
}
