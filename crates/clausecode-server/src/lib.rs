//! HTTP surface for the ClauseCode analysis store.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | /health | Liveness check |
//! | POST | /save | Dual-write an analysis |
//! | GET | /analyses | List analyses, newest first |
//! | GET | /analyses/{id} | Fetch one analysis |
//! | DELETE | /analyses/{id} | Delete one analysis |

mod handlers;
pub mod types;

pub use handlers::{AppState, USER_ID_HEADER};

use axum::Router;
use axum::routing::{get, post};
use clausecode_config::ClauseCodeConfig;
use clausecode_store::{AnalysisStore, FlatFileBackend, SqliteConnector, StoreOptions};
use log::{info, warn};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Build the router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/save", post(handlers::save))
        .route("/analyses", get(handlers::list_analyses))
        .route(
            "/analyses/{id}",
            get(handlers::get_analysis).delete(handlers::delete_analysis),
        )
        .with_state(state)
}

/// Map configuration onto store options.
pub fn store_options(config: &ClauseCodeConfig) -> StoreOptions {
    StoreOptions {
        operation_timeout: Duration::from_millis(config.storage.documents.operation_timeout_ms),
        overfetch_factor: config.storage.list.overfetch_factor,
    }
}

/// Assemble the store from configuration.
///
/// The document backend is connected lazily; the audit log is opened here so
/// its header exists before the first request. A log that cannot be opened is
/// skipped with a warning.
pub fn build_store(config: &ClauseCodeConfig, cwd: &Path) -> AnalysisStore {
    let options = store_options(config);
    let documents = &config.storage.documents;
    let store = if documents.enabled {
        let connector = SqliteConnector::new(
            documents.path.as_ref().map(|path| cwd.join(path)),
            documents.collection.clone(),
        );
        AnalysisStore::new(Arc::new(connector), options)
    } else {
        info!("document store disabled by configuration");
        AnalysisStore::disabled(options)
    };

    let flat_file = &config.storage.flat_file;
    if !flat_file.is_enabled(&config.deployment) {
        info!("csv audit log disabled");
        return store;
    }
    let path = flat_file.resolved_path(&config.deployment, cwd);
    match FlatFileBackend::open(&path) {
        Ok(backend) => {
            info!("csv audit log at {}", path.display());
            store.with_audit_log(Arc::new(backend))
        }
        Err(err) => {
            warn!("could not open csv audit log {}: {err}", path.display());
            store
        }
    }
}

/// Serve the API on `listener` until `shutdown` resolves, then drain.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!("failed to listen for ctrl-c, running until killed: {err}");
            std::future::pending::<()>().await;
        }
    }
}
