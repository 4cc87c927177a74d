//! Error types for storage backends.

use crate::backend::BackendKind;
use std::time::Duration;

/// Errors returned by storage backends and connectors.
///
/// `AnalysisStore` absorbs these at its operation boundary; they only reach
/// code that talks to a backend directly.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// No backend could be reached or constructed.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The backend does not implement the requested capability.
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        backend: BackendKind,
        operation: &'static str,
    },
    /// The operation did not finish within the configured bound.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    /// Collection name is not a plain identifier.
    #[error("invalid collection name: {0}")]
    InvalidCollection(String),
    /// A blocking worker task failed.
    #[error("worker task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Whether the error means "this backend cannot do that" rather than a failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StoreError::Unsupported { .. })
    }
}
