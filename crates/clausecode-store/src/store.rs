//! Best-effort analysis store with degraded-mode fallbacks.
//!
//! `AnalysisStore` never returns operational errors. A missing or failing
//! document backend turns `save`/`get` into `None`, `list` into an empty
//! vector and `delete` into `false`; the reason is logged.

use crate::backend::{AnalysisBackend, BackendConnector, BackendKind};
use crate::error::StoreError;
use crate::model::{AnalysisDocument, AnalysisRecord, NewAnalysis};
use crate::query::{AnalysisQuery, DEFAULT_OVERFETCH_FACTOR};
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Runtime knobs for the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Upper bound for every backend call, including connection attempts.
    pub operation_timeout: Duration,
    /// Multiplier applied to `limit` when a list query carries filters.
    pub overfetch_factor: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            overfetch_factor: DEFAULT_OVERFETCH_FACTOR,
        }
    }
}

/// Outcome of a dual write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Backends that accepted the write, in write order.
    pub saved_to: Vec<BackendKind>,
    /// Id assigned by the document store, if it accepted the write.
    pub document_id: Option<String>,
}

/// Analysis store owned by the composition root and shared by handle.
pub struct AnalysisStore {
    connector: Option<Arc<dyn BackendConnector>>,
    documents: OnceCell<Arc<dyn AnalysisBackend>>,
    audit_log: Option<Arc<dyn AnalysisBackend>>,
    options: StoreOptions,
}

impl AnalysisStore {
    /// Store whose document backend is connected lazily on first use.
    pub fn new(connector: Arc<dyn BackendConnector>, options: StoreOptions) -> Self {
        Self {
            connector: Some(connector),
            documents: OnceCell::new(),
            audit_log: None,
            options,
        }
    }

    /// Store with the document backend turned off by configuration.
    pub fn disabled(options: StoreOptions) -> Self {
        Self {
            connector: None,
            documents: OnceCell::new(),
            audit_log: None,
            options,
        }
    }

    /// Store around an already connected document backend.
    pub fn with_backend(backend: Arc<dyn AnalysisBackend>, options: StoreOptions) -> Self {
        Self {
            connector: None,
            documents: OnceCell::new_with(Some(backend)),
            audit_log: None,
            options,
        }
    }

    /// Mirror every `persist` into an append-only audit log.
    pub fn with_audit_log(mut self, audit_log: Arc<dyn AnalysisBackend>) -> Self {
        self.audit_log = Some(audit_log);
        self
    }

    /// Whether the document backend is connected.
    pub fn is_initialized(&self) -> bool {
        self.documents.initialized()
    }

    pub fn has_audit_log(&self) -> bool {
        self.audit_log.is_some()
    }

    /// Connect the document backend if that has not happened yet.
    ///
    /// Idempotent. Concurrent callers share one attempt; a failed attempt
    /// leaves the store uninitialized and the next call tries again.
    pub async fn initialize(&self) -> bool {
        self.documents().await.is_some()
    }

    async fn documents(&self) -> Option<&Arc<dyn AnalysisBackend>> {
        if let Some(backend) = self.documents.get() {
            return Some(backend);
        }
        let connector = self.connector.as_ref()?;
        let attempt = self
            .documents
            .get_or_try_init(|| self.bounded("connect", connector.connect()))
            .await;
        match attempt {
            Ok(backend) => {
                info!("document store initialized");
                Some(backend)
            }
            Err(err) => {
                warn!("document store unavailable, continuing without persistence: {err}");
                None
            }
        }
    }

    /// Save a new analysis to the document store.
    ///
    /// Returns the generated id, or `None` when the store is unavailable or
    /// the write failed.
    pub async fn save(&self, analysis: &NewAnalysis) -> Option<String> {
        self.save_document(&analysis.clone().into_document(Utc::now()))
            .await
    }

    async fn save_document(&self, document: &AnalysisDocument) -> Option<String> {
        let Some(backend) = self.documents().await else {
            debug!("document store not available, skipping save");
            return None;
        };
        match self.bounded("save", backend.insert(document)).await {
            Ok(Some(id)) => {
                info!("saved analysis to document store (id={id})");
                Some(id)
            }
            Ok(None) => {
                warn!("document store accepted the write without assigning an id");
                None
            }
            Err(err) => {
                report_failure("save", &err);
                None
            }
        }
    }

    /// Fetch a single analysis by id.
    pub async fn get(&self, id: &str) -> Option<AnalysisRecord> {
        let backend = self.documents().await?;
        match self.bounded("get", backend.fetch(id)).await {
            Ok(record) => record,
            Err(err) => {
                report_failure("get", &err);
                None
            }
        }
    }

    /// List analyses newest first, filtering client-side.
    ///
    /// With filters, at most `limit * overfetch_factor` of the newest records
    /// are examined, so sparse matches can come back short of `limit`.
    pub async fn list(&self, query: &AnalysisQuery) -> Vec<AnalysisRecord> {
        if query.limit == 0 {
            return Vec::new();
        }
        let Some(backend) = self.documents().await else {
            return Vec::new();
        };
        let fetch_limit = query.fetch_limit(self.options.overfetch_factor);
        match self.bounded("list", backend.recent(fetch_limit)).await {
            Ok(candidates) => {
                let examined = candidates.len();
                let results = query.select(candidates);
                info!(
                    "retrieved analyses (returned={}, examined={examined})",
                    results.len()
                );
                results
            }
            Err(err) => {
                report_failure("list", &err);
                Vec::new()
            }
        }
    }

    /// Delete an analysis; true only when the backend confirms removal.
    pub async fn delete(&self, id: &str) -> bool {
        let Some(backend) = self.documents().await else {
            return false;
        };
        match self.bounded("delete", backend.remove(id)).await {
            Ok(true) => {
                info!("deleted analysis from document store (id={id})");
                true
            }
            Ok(false) => {
                debug!("nothing deleted (id={id})");
                false
            }
            Err(err) => {
                report_failure("delete", &err);
                false
            }
        }
    }

    /// Write to the audit log (when configured) and the document store.
    ///
    /// Each backend is independent; a failure in one does not stop the other.
    pub async fn persist(&self, analysis: &NewAnalysis) -> SaveReport {
        let mut report = SaveReport::default();
        let document = analysis.clone().into_document(Utc::now());
        if let Some(audit_log) = &self.audit_log {
            match self.bounded("append", audit_log.insert(&document)).await {
                Ok(_) => report.saved_to.push(audit_log.kind()),
                Err(err) => warn!("could not append to {} audit log: {err}", audit_log.kind()),
            }
        }
        if let Some(id) = self.save_document(&document).await {
            report.saved_to.push(BackendKind::DocumentStore);
            report.document_id = Some(id);
        }
        report
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let after = self.options.operation_timeout;
        tokio::time::timeout(after, fut)
            .await
            .unwrap_or(Err(StoreError::Timeout { operation, after }))
    }
}

fn report_failure(operation: &str, err: &StoreError) {
    if err.is_unsupported() {
        debug!("{operation} skipped: {err}");
    } else {
        error!("failed to {operation} analysis: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisStore, StoreOptions};
    use crate::model::NewAnalysis;
    use crate::query::AnalysisQuery;
    use crate::sqlite::{DEFAULT_COLLECTION, SqliteDocumentBackend};
    use chrono::{Duration as ChronoDuration, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn analysis(timestamp: &str) -> NewAnalysis {
        NewAnalysis {
            timestamp: timestamp.to_string(),
            agent: "lawyer".to_string(),
            analysis_type: "summary".to_string(),
            page_title: "Terms".to_string(),
            page_url: "https://example.com/terms".to_string(),
            result_text: "Looks fine".to_string(),
            ..NewAnalysis::default()
        }
    }

    fn sqlite_store() -> AnalysisStore {
        let backend = SqliteDocumentBackend::in_memory(DEFAULT_COLLECTION).expect("backend");
        AnalysisStore::with_backend(Arc::new(backend), StoreOptions::default())
    }

    #[tokio::test]
    async fn disabled_store_degrades_to_empty_results() {
        let store = AnalysisStore::disabled(StoreOptions::default());
        assert!(!store.initialize().await);
        assert_eq!(store.save(&analysis("2024-01-01T00:00:00Z")).await, None);
        assert_eq!(store.get("anything").await, None);
        assert!(store.list(&AnalysisQuery::new(10)).await.is_empty());
        assert!(!store.delete("anything").await);
        assert!(store.persist(&analysis("x")).await.saved_to.is_empty());
    }

    #[tokio::test]
    async fn unparseable_timestamp_uses_save_time() {
        let store = sqlite_store();
        let before = Utc::now();
        let id = store.save(&analysis("not a time")).await.expect("id");
        let record = store.get(&id).await.expect("record");
        let after = Utc::now();
        assert!(record.document.timestamp >= before - ChronoDuration::seconds(1));
        assert!(record.document.timestamp <= after + ChronoDuration::seconds(1));
    }

    #[tokio::test]
    async fn zero_limit_lists_nothing() {
        let store = sqlite_store();
        store.save(&analysis("2024-01-01T00:00:00Z")).await.expect("id");
        assert!(store.list(&AnalysisQuery::new(0)).await.is_empty());
    }
}
