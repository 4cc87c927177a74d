//! SQLite-backed document store.
//!
//! Each collection is a table holding one JSON document per record, plus the
//! `timestamp` and `created_at` columns needed for newest-first listing.

use crate::backend::{AnalysisBackend, BackendConnector, BackendKind};
use crate::error::StoreError;
use crate::model::{AnalysisDocument, AnalysisRecord};
use crate::timestamp::sortable;
use async_trait::async_trait;
use directories::ProjectDirs;
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Collection used when configuration does not name one.
pub const DEFAULT_COLLECTION: &str = "clausecode_analyses";
/// Database filename under the ambient data directory.
const AMBIENT_DATABASE_FILE: &str = "analyses.db";

/// Document backend over a single SQLite connection.
pub struct SqliteDocumentBackend {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

impl SqliteDocumentBackend {
    /// Open (or create) the database at `path` and ensure the collection exists.
    pub fn open(path: impl AsRef<Path>, collection: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let backend = Self::from_connection(Connection::open(path)?, collection)?;
        info!(
            "opened sqlite document store (path={}, collection={collection})",
            path.display()
        );
        Ok(backend)
    }

    /// In-memory database, mainly for tests.
    pub fn in_memory(collection: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, collection)
    }

    fn from_connection(conn: Connection, collection: &str) -> Result<Self, StoreError> {
        validate_collection(collection)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                created_at TEXT NOT NULL,
                document TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS {collection}_timestamp_idx
                ON {collection} (timestamp DESC);"
        ))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.to_string(),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let collection = self.collection.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn, &collection)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl AnalysisBackend for SqliteDocumentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DocumentStore
    }

    async fn insert(&self, document: &AnalysisDocument) -> Result<Option<String>, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let body = serde_json::to_string(document)?;
        let timestamp = sortable(&document.timestamp);
        let created_at = sortable(&document.created_at);
        let row_id = id.clone();
        self.with_conn(move |conn, collection| {
            conn.execute(
                &format!(
                    "INSERT INTO {collection} (id, timestamp, created_at, document)
                     VALUES (?1, ?2, ?3, ?4)"
                ),
                params![row_id, timestamp, created_at, body],
            )?;
            Ok(())
        })
        .await?;
        debug!("inserted analysis document (id={id})");
        Ok(Some(id))
    }

    async fn fetch(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn, collection| {
            let body: Option<String> = conn
                .query_row(
                    &format!("SELECT document FROM {collection} WHERE id = ?1"),
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            match body {
                Some(body) => Ok(Some(decode_record(id, &body)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AnalysisRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn, collection| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, document FROM {collection}
                 ORDER BY timestamp DESC, created_at DESC, rowid DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut records = Vec::new();
            for row in rows {
                let (id, body) = row?;
                records.push(decode_record(id, &body)?);
            }
            Ok(records)
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn, collection| {
            let removed = conn.execute(
                &format!("DELETE FROM {collection} WHERE id = ?1"),
                params![id],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}

/// Resolves where the SQLite database lives and opens it.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    configured_path: Option<PathBuf>,
    collection: String,
}

impl SqliteConnector {
    pub fn new(configured_path: Option<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            configured_path,
            collection: collection.into(),
        }
    }

    /// Explicit path first, then the per-user data directory.
    pub fn resolve_path(&self) -> Result<PathBuf, StoreError> {
        if let Some(path) = &self.configured_path {
            return Ok(path.clone());
        }
        let path = ambient_database_path().ok_or_else(|| {
            StoreError::Unavailable(
                "no database path configured and no user data directory".to_string(),
            )
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

/// Database file in the per-user data directory, if the platform has one.
fn ambient_database_path() -> Option<PathBuf> {
    ProjectDirs::from("ai", "clausecode", "clausecode")
        .map(|dirs| dirs.data_dir().join(AMBIENT_DATABASE_FILE))
}

#[async_trait]
impl BackendConnector for SqliteConnector {
    async fn connect(&self) -> Result<Arc<dyn AnalysisBackend>, StoreError> {
        let path = self.resolve_path()?;
        let collection = self.collection.clone();
        let backend = tokio::task::spawn_blocking(move || {
            SqliteDocumentBackend::open(path, &collection)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))??;
        Ok(Arc::new(backend))
    }
}

fn decode_record(id: String, body: &str) -> Result<AnalysisRecord, StoreError> {
    let document: AnalysisDocument = serde_json::from_str(body)?;
    Ok(AnalysisRecord::new(id, document))
}

fn validate_collection(collection: &str) -> Result<(), StoreError> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(collection.to_string()))
    }
}
