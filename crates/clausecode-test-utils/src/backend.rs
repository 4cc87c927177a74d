use async_trait::async_trait;
use clausecode_store::{
    AnalysisBackend, AnalysisDocument, AnalysisRecord, BackendConnector, BackendKind, StoreError,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory document backend with sequential ids.
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<AnalysisRecord>>,
    next_id: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Snapshot of stored records in insertion order.
    pub fn records(&self) -> Vec<AnalysisRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl AnalysisBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DocumentStore
    }

    async fn insert(&self, document: &AnalysisDocument) -> Result<Option<String>, StoreError> {
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.records
            .lock()
            .push(AnalysisRecord::new(id.clone(), document.clone()));
        Ok(Some(id))
    }

    async fn fetch(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AnalysisRecord>, StoreError> {
        let mut records = self.records.lock().clone();
        records.reverse();
        records.sort_by(|a, b| b.document.timestamp.cmp(&a.document.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() != before)
    }
}

/// Backend whose every call fails, as if the remote end went away.
#[derive(Debug, Clone)]
pub struct FailingBackend {
    kind: BackendKind,
}

impl FailingBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }

    fn failure(&self) -> StoreError {
        StoreError::Unavailable(format!("{} backend is down", self.kind))
    }
}

#[async_trait]
impl AnalysisBackend for FailingBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn insert(&self, _document: &AnalysisDocument) -> Result<Option<String>, StoreError> {
        Err(self.failure())
    }

    async fn fetch(&self, _id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Err(self.failure())
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<AnalysisRecord>, StoreError> {
        Err(self.failure())
    }

    async fn remove(&self, _id: &str) -> Result<bool, StoreError> {
        Err(self.failure())
    }
}

/// Backend that sleeps before answering, for exercising timeouts.
#[derive(Debug, Clone)]
pub struct StalledBackend {
    delay: Duration,
}

impl StalledBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AnalysisBackend for StalledBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DocumentStore
    }

    async fn insert(&self, _document: &AnalysisDocument) -> Result<Option<String>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(Some("late".to_string()))
    }

    async fn fetch(&self, _id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<AnalysisRecord>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn remove(&self, _id: &str) -> Result<bool, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(true)
    }
}

/// Connector that fails a fixed number of times before handing out a backend.
pub struct ScriptedConnector {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    backend: Arc<dyn AnalysisBackend>,
}

impl ScriptedConnector {
    pub fn new(failures: usize, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            backend,
        }
    }

    /// Connector that never succeeds.
    pub fn unavailable() -> Self {
        Self::new(usize::MAX, Arc::new(MemoryBackend::new()))
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendConnector for ScriptedConnector {
    async fn connect(&self) -> Result<Arc<dyn AnalysisBackend>, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(StoreError::Unavailable("no credentials".to_string()));
        }
        Ok(Arc::clone(&self.backend))
    }
}
