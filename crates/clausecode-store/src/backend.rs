//! Backend capability interface.

use crate::error::StoreError;
use crate::model::{AnalysisDocument, AnalysisRecord};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Concrete storage implementations the store can write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BackendKind {
    /// Queryable document store.
    #[serde(rename = "document_store")]
    DocumentStore,
    /// Append-only CSV audit log.
    #[serde(rename = "csv")]
    FlatFile,
}

impl BackendKind {
    /// Stable label used in save reports.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::DocumentStore => "document_store",
            BackendKind::FlatFile => "csv",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
/// Storage backend abstraction used by `AnalysisStore`.
///
/// Only `insert` is mandatory. Backends that cannot read or delete keep the
/// default implementations, which report `StoreError::Unsupported`.
pub trait AnalysisBackend: Send + Sync {
    /// Which kind of backend this is.
    fn kind(&self) -> BackendKind;

    /// Write a new document, returning the generated id if the backend has ids.
    async fn insert(&self, document: &AnalysisDocument) -> Result<Option<String>, StoreError>;

    /// Read a single record by id.
    async fn fetch(&self, _id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Err(self.unsupported("fetch"))
    }

    /// Up to `limit` records ordered by `timestamp`, newest first.
    async fn recent(&self, _limit: usize) -> Result<Vec<AnalysisRecord>, StoreError> {
        Err(self.unsupported("recent"))
    }

    /// Remove a record, returning true only if something was deleted.
    async fn remove(&self, _id: &str) -> Result<bool, StoreError> {
        Err(self.unsupported("remove"))
    }

    /// Build the error for a capability this backend lacks.
    fn unsupported(&self, operation: &'static str) -> StoreError {
        StoreError::Unsupported {
            backend: self.kind(),
            operation,
        }
    }
}

#[async_trait]
/// Constructs the document backend on demand.
///
/// The store calls this lazily and again after a failed attempt, so a
/// connector must be safe to invoke repeatedly.
pub trait BackendConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn AnalysisBackend>, StoreError>;
}
