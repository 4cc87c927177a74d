//! Analysis record storage for ClauseCode.
//!
//! The store keeps analysis results in a queryable document backend and can
//! mirror every write into an append-only CSV audit log. Storage is best-effort:
//! an unreachable backend degrades to no-op results instead of failing callers.

pub mod backend;
pub mod error;
pub mod flat_file;
pub mod model;
pub mod query;
pub mod sqlite;
pub mod store;
pub mod timestamp;

/// Backend capability interface and connector.
pub use backend::{AnalysisBackend, BackendConnector, BackendKind};
/// Store error type.
pub use error::StoreError;
/// Append-only CSV audit log.
pub use flat_file::{FLAT_FILE_HEADERS, FlatFileBackend};
/// Analysis record model.
pub use model::{AnalysisDocument, AnalysisRecord, NewAnalysis};
/// List query and filtering.
pub use query::{AnalysisQuery, DEFAULT_LIST_LIMIT, DEFAULT_OVERFETCH_FACTOR};
/// SQLite document backend and its connector.
pub use sqlite::{DEFAULT_COLLECTION, SqliteConnector, SqliteDocumentBackend};
/// Store facade.
pub use store::{AnalysisStore, SaveReport, StoreOptions};
