//! AnalysisStore behaviour across backends and failure modes.

use chrono::{Duration as ChronoDuration, SecondsFormat, TimeZone, Utc};
use clausecode_store::{
    AnalysisBackend, AnalysisQuery, AnalysisStore, BackendKind, DEFAULT_COLLECTION,
    FLAT_FILE_HEADERS, FlatFileBackend, NewAnalysis, SaveReport, SqliteConnector,
    SqliteDocumentBackend, StoreOptions,
};
use clausecode_test_utils::{
    FailingBackend, MemoryBackend, ScriptedConnector, StalledBackend, sample_analysis,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn sqlite_store() -> AnalysisStore {
    let backend = SqliteDocumentBackend::in_memory(DEFAULT_COLLECTION).expect("backend");
    AnalysisStore::with_backend(Arc::new(backend), StoreOptions::default())
}

fn at_minute(minute: i64) -> String {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    (base + ChronoDuration::minutes(minute)).to_rfc3339()
}

/// An unreachable backend degrades every operation to its empty value.
#[tokio::test]
async fn unavailable_backend_degrades_every_operation() {
    let connector = Arc::new(ScriptedConnector::unavailable());
    let store = AnalysisStore::new(connector.clone(), StoreOptions::default());

    assert!(!store.initialize().await);
    assert!(!store.is_initialized());
    assert_eq!(store.save(&sample_analysis(&at_minute(1), "lawyer")).await, None);
    assert_eq!(store.get("doc-1").await, None);
    assert!(store.list(&AnalysisQuery::new(5)).await.is_empty());
    assert!(!store.delete("doc-1").await);
    assert!(connector.attempts() >= 5);
}

/// A backend that errors on every call is absorbed the same way.
#[tokio::test]
async fn failing_backend_is_absorbed() {
    let backend = Arc::new(FailingBackend::new(BackendKind::DocumentStore));
    let store = AnalysisStore::with_backend(backend, StoreOptions::default());

    assert!(store.is_initialized());
    assert_eq!(store.save(&sample_analysis(&at_minute(1), "lawyer")).await, None);
    assert_eq!(store.get("doc-1").await, None);
    assert!(store.list(&AnalysisQuery::new(5).with_agent("lawyer")).await.is_empty());
    assert!(!store.delete("doc-1").await);
}

/// A failed connection attempt is retried on the next use.
#[tokio::test]
async fn initialization_retries_after_failure() {
    let backend: Arc<dyn AnalysisBackend> = Arc::new(MemoryBackend::new());
    let connector = Arc::new(ScriptedConnector::new(1, backend));
    let store = AnalysisStore::new(connector.clone(), StoreOptions::default());

    assert!(!store.initialize().await);
    assert!(store.initialize().await);
    assert!(store.initialize().await);
    assert!(store.save(&sample_analysis(&at_minute(1), "lawyer")).await.is_some());
    assert_eq!(connector.attempts(), 2);
}

/// Concurrent first callers share a single connection attempt.
#[tokio::test]
async fn concurrent_initialization_connects_once() {
    let backend: Arc<dyn AnalysisBackend> = Arc::new(MemoryBackend::new());
    let connector = Arc::new(ScriptedConnector::new(0, backend));
    let store = AnalysisStore::new(connector.clone(), StoreOptions::default());

    let (a, b, c) = tokio::join!(store.initialize(), store.initialize(), store.initialize());
    assert!(a && b && c);
    assert_eq!(connector.attempts(), 1);
}

/// Saved records come back with every supplied field intact.
#[tokio::test]
async fn save_then_get_round_trips_supplied_fields() {
    let store = sqlite_store();
    let mut metadata = serde_json::Map::new();
    metadata.insert("source".to_string(), json!("upload"));
    let analysis = NewAnalysis {
        page_content: Some("Full terms text".to_string()),
        user_id: Some("user-7".to_string()),
        metadata: Some(metadata.clone()),
        ..sample_analysis("2024-06-01T10:00:00Z", "lawyer")
    };

    let before = Utc::now();
    let id = store.save(&analysis).await.expect("id");
    let record = store.get(&id).await.expect("record");

    assert_eq!(record.id, id);
    let document = record.document;
    assert_eq!(
        document.timestamp,
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    );
    assert_eq!(document.agent, analysis.agent);
    assert_eq!(document.analysis_type, analysis.analysis_type);
    assert_eq!(document.page_title, analysis.page_title);
    assert_eq!(document.page_url, analysis.page_url);
    assert_eq!(document.result_text, analysis.result_text);
    assert_eq!(document.page_content.as_deref(), Some("Full terms text"));
    assert_eq!(document.user_id.as_deref(), Some("user-7"));
    assert_eq!(document.metadata, Some(metadata));
    assert!(document.created_at >= before - ChronoDuration::seconds(1));
}

/// Listing returns the newest records first.
#[tokio::test]
async fn list_orders_by_timestamp_descending() {
    let store = sqlite_store();
    let t2 = store.save(&sample_analysis(&at_minute(2), "lawyer")).await.expect("t2");
    let t1 = store.save(&sample_analysis(&at_minute(1), "lawyer")).await.expect("t1");
    let t3 = store.save(&sample_analysis(&at_minute(3), "lawyer")).await.expect("t3");

    let ids: Vec<String> = store
        .list(&AnalysisQuery::new(3))
        .await
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ids, vec![t3, t2, t1]);
}

/// Filtered listing finds sparse matches inside the over-fetch window only.
#[tokio::test]
async fn filtered_list_is_bounded_by_overfetch_window() {
    let store = sqlite_store();
    let lawyer_minutes = [10, 60, 70, 80];
    let mut lawyer_ids = Vec::new();
    for minute in 0..100 {
        let agent = if lawyer_minutes.contains(&minute) {
            "lawyer"
        } else {
            "auditor"
        };
        let id = store
            .save(&sample_analysis(&at_minute(minute), agent))
            .await
            .expect("save");
        if agent == "lawyer" {
            lawyer_ids.push((minute, id));
        }
    }

    let results = store.list(&AnalysisQuery::new(5).with_agent("lawyer")).await;
    let minutes: Vec<String> = results
        .iter()
        .map(|record| record.document.timestamp.to_rfc3339())
        .collect();
    assert_eq!(minutes, vec![at_minute(80), at_minute(70), at_minute(60)]);

    let oldest_lawyer = &lawyer_ids[0].1;
    assert!(results.iter().all(|record| &record.id != oldest_lawyer));
}

/// A filtered list stops once `limit` matches are found.
#[tokio::test]
async fn filtered_list_stops_at_limit() {
    let backend = Arc::new(MemoryBackend::new());
    let store = AnalysisStore::with_backend(backend, StoreOptions::default());
    for minute in 0..6 {
        let mut analysis = sample_analysis(&at_minute(minute), "lawyer");
        analysis.user_id = Some(if minute % 2 == 0 { "even" } else { "odd" }.to_string());
        store.save(&analysis).await.expect("save");
    }

    let results = store
        .list(&AnalysisQuery::new(2).with_agent("lawyer").with_user_id("even"))
        .await;
    let stamps: Vec<String> = results
        .iter()
        .map(|record| record.document.timestamp.to_rfc3339())
        .collect();
    assert_eq!(stamps, vec![at_minute(4), at_minute(2)]);
}

/// Deleted records can no longer be fetched.
#[tokio::test]
async fn delete_removes_from_get() {
    let store = sqlite_store();
    let id = store
        .save(&sample_analysis(&at_minute(1), "lawyer"))
        .await
        .expect("id");
    assert!(store.delete(&id).await);
    assert_eq!(store.get(&id).await, None);
    assert!(!store.delete(&id).await);
}

/// Saving the same content twice creates two records; nothing is overwritten.
#[tokio::test]
async fn saving_twice_never_updates() {
    let store = sqlite_store();
    let analysis = sample_analysis(&at_minute(1), "lawyer");
    let first = store.save(&analysis).await.expect("first");
    let second = store.save(&analysis).await.expect("second");
    assert_ne!(first, second);
    assert_eq!(store.list(&AnalysisQuery::new(10)).await.len(), 2);
}

/// Slow backends are cut off by the operation timeout.
#[tokio::test]
async fn timed_out_operations_degrade() {
    let options = StoreOptions {
        operation_timeout: Duration::from_millis(50),
        ..StoreOptions::default()
    };
    let backend = Arc::new(StalledBackend::new(Duration::from_secs(5)));
    let store = AnalysisStore::with_backend(backend, options);

    assert_eq!(store.save(&sample_analysis(&at_minute(1), "lawyer")).await, None);
    assert_eq!(store.get("late").await, None);
    assert!(store.list(&AnalysisQuery::new(3)).await.is_empty());
    assert!(!store.delete("late").await);
}

/// Dual write reports every backend that accepted the record.
#[tokio::test]
async fn persist_writes_audit_log_and_documents() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("analysis_data.csv");
    let audit_log = Arc::new(FlatFileBackend::open(&path).expect("csv"));
    let documents = Arc::new(MemoryBackend::new());
    let store = AnalysisStore::with_backend(documents.clone(), StoreOptions::default())
        .with_audit_log(audit_log);

    let report = store.persist(&sample_analysis(&at_minute(1), "lawyer")).await;
    assert_eq!(
        report,
        SaveReport {
            saved_to: vec![BackendKind::FlatFile, BackendKind::DocumentStore],
            document_id: Some("doc-1".to_string()),
        }
    );
    assert_eq!(documents.len(), 1);
    let contents = std::fs::read_to_string(&path).expect("read");
    assert_eq!(contents.lines().count(), 2);
}

/// A fallback timestamp is resolved once and shared by both backends.
#[tokio::test]
async fn persist_writes_one_timestamp_to_both_backends() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("analysis_data.csv");
    let audit_log = Arc::new(FlatFileBackend::open(&path).expect("csv"));
    let documents = Arc::new(MemoryBackend::new());
    let store = AnalysisStore::with_backend(documents.clone(), StoreOptions::default())
        .with_audit_log(audit_log);

    let report = store
        .persist(&sample_analysis("sometime last week", "lawyer"))
        .await;
    assert_eq!(report.saved_to.len(), 2);

    let records = documents.records();
    assert_eq!(records.len(), 1);
    let stored = records[0]
        .document
        .timestamp
        .to_rfc3339_opts(SecondsFormat::AutoSi, true);
    let contents = std::fs::read_to_string(&path).expect("read");
    let line = contents.lines().nth(1).expect("audit line");
    assert_eq!(line.split(',').next(), Some(stored.as_str()));
}

/// One backend failing does not stop the other.
#[tokio::test]
async fn persist_survives_a_failing_backend() {
    let documents = Arc::new(MemoryBackend::new());
    let store = AnalysisStore::with_backend(documents.clone(), StoreOptions::default())
        .with_audit_log(Arc::new(FailingBackend::new(BackendKind::FlatFile)));
    let report = store.persist(&sample_analysis(&at_minute(1), "lawyer")).await;
    assert_eq!(report.saved_to, vec![BackendKind::DocumentStore]);

    let temp = tempdir().expect("tempdir");
    let audit_log = Arc::new(FlatFileBackend::open(temp.path().join("log.csv")).expect("csv"));
    let store = AnalysisStore::disabled(StoreOptions::default()).with_audit_log(audit_log);
    let report = store.persist(&sample_analysis(&at_minute(1), "lawyer")).await;
    assert_eq!(report.saved_to, vec![BackendKind::FlatFile]);
    assert_eq!(report.document_id, None);
}

/// Concurrent appends produce exactly one well-formed line each.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_audit_appends_do_not_interleave() {
    const WRITERS: usize = 64;
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("analysis_data.csv");
    let audit_log = Arc::new(FlatFileBackend::open(&path).expect("csv"));
    let store = Arc::new(
        AnalysisStore::disabled(StoreOptions::default()).with_audit_log(audit_log),
    );

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let mut analysis = sample_analysis(&at_minute(writer as i64), "lawyer");
            analysis.result_text = format!("result {writer} {}", "x".repeat(2048));
            store.persist(&analysis).await
        }));
    }
    for handle in handles {
        let report = handle.await.expect("join");
        assert_eq!(report.saved_to, vec![BackendKind::FlatFile]);
    }

    let contents = std::fs::read_to_string(&path).expect("read");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), WRITERS + 1);
    assert_eq!(lines[0], FLAT_FILE_HEADERS.join(","));
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), 6, "malformed line: {line}");
        assert!(line.contains(",lawyer,summary,"));
    }
}

/// The connector falls back to nothing silently when the path is unusable.
#[tokio::test]
async fn bad_database_path_leaves_store_uninitialized() {
    let temp = tempdir().expect("tempdir");
    let connector = Arc::new(SqliteConnector::new(
        Some(temp.path().join("missing").join("db.sqlite")),
        DEFAULT_COLLECTION,
    ));
    let store = AnalysisStore::new(connector, StoreOptions::default());
    assert!(!store.initialize().await);
    assert_eq!(store.save(&sample_analysis(&at_minute(1), "lawyer")).await, None);
}
