//! ClauseCode analysis data server.

use anyhow::Context;
use clap::Parser;
use clausecode_config::{ClauseCodeConfig, LayeredConfigOptions};
use clausecode_server::{AppState, build_store, serve, shutdown_signal};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Command-line options for the server.
#[derive(Parser)]
#[command(name = "clausecode-server", version)]
struct Cli {
    /// Extra clausecode.json5 layer applied over the discovered ones
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address override
    #[arg(long)]
    host: Option<String>,
    /// Listen port override
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry RUST_LOG, so it is loaded before the logger.
    let dotenv = dotenvy::dotenv();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
    match dotenv {
        Ok(path) => info!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => debug!("no .env file"),
        Err(err) => warn!("ignoring unreadable .env file: {err}"),
    }

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("cwd")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = cli.config.as_ref() {
        options = options.with_runtime_path(path);
    }
    let layered =
        ClauseCodeConfig::load_layered_with_options(options).context("failed to load config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let mut config = layered.config;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if config.deployment.ephemeral_filesystem {
        info!("ephemeral deployment: local files are not kept across restarts");
    }

    let store = Arc::new(build_store(&config, &cwd));
    if store.initialize().await {
        info!("document store connected, persistence enabled");
    } else if config.storage.documents.enabled {
        warn!("document store unavailable at startup, will retry on first use");
    }
    if !store.is_initialized() && !store.has_audit_log() {
        error!("no storage backend available, analyses will not be persisted");
    }

    let state = AppState::new(store, config.storage.list.default_limit);
    let addr = (config.server.host.as_str(), config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}:{}", addr.0, addr.1))?;
    info!("listening on {}", listener.local_addr()?);

    serve(listener, state, shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}
