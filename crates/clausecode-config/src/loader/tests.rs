//! Tests for layered configuration loading.

use super::*;
use crate::ServerConfig;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

fn isolated_options(cwd: &Path) -> LayeredConfigOptions {
    LayeredConfigOptions::new(cwd)
        .with_user_config_path(None)
        .with_env(EnvOverrides::default())
}

#[test]
fn parse_minimal_config() {
    let config = ClauseCodeConfig::load_from_str("{}").expect("config");
    assert_eq!(config, ClauseCodeConfig::default());
    assert_eq!(config.server.port, 5001);
    assert_eq!(config.storage.documents.collection, "clausecode_analyses");
    assert_eq!(config.storage.list.overfetch_factor, 10);
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = ClauseCodeConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

#[test]
fn rejects_mistyped_nested_field() {
    let err = ClauseCodeConfig::load_from_str(r#"{ storage: { documents: { enabled: "yes" } } }"#)
        .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("storage.documents.enabled"), "{msg}");
}

#[test]
fn rejects_zero_overfetch_factor() {
    let err = ClauseCodeConfig::load_from_str("{ storage: { list: { overfetch_factor: 0 } } }")
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn rejects_blank_collection() {
    let err = ClauseCodeConfig::load_from_str(r#"{ storage: { documents: { collection: " " } } }"#)
        .unwrap_err();
    assert!(format!("{err}").contains("collection"));
}

#[test]
fn accepts_json5_comments_and_trailing_commas() {
    let contents = r#"{
        // local dev
        server: { port: 8080, },
        storage: { flat_file: { enabled: false, path: null } },
    }"#;
    let config = ClauseCodeConfig::load_from_str(contents).expect("config");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.storage.flat_file.enabled, Some(false));
}

#[test]
fn cwd_layer_overrides_user_layer() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("service");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("user.json5");
    write_json5(
        &user_config,
        r#"{ server: { host: "127.0.0.1", port: 7000 } }"#,
    );
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ server: { port: 7001 } }");

    let layered = ClauseCodeConfig::load_layered_with_options(
        isolated_options(&cwd).with_user_config_path(Some(user_config)),
    )
    .expect("layered");

    assert_eq!(layered.config.server.host, "127.0.0.1");
    assert_eq!(layered.config.server.port, 7001);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Env
        ]
    );
}

#[test]
fn runtime_layer_and_env_win() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path();
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ storage: { documents: { path: "cwd.db" } } }"#,
    );
    write_json5(
        &cwd.join("override.json5"),
        r#"{ storage: { documents: { path: "runtime.db" }, list: { default_limit: 20 } } }"#,
    );

    let layered = ClauseCodeConfig::load_layered_with_options(
        isolated_options(cwd)
            .with_runtime_path("override.json5")
            .with_env(EnvOverrides::from_pairs([("PORT", "9000")])),
    )
    .expect("layered");

    assert_eq!(
        layered.config.storage.documents.path.as_deref(),
        Some("runtime.db")
    );
    assert_eq!(layered.config.storage.list.default_limit, 20);
    assert_eq!(layered.config.server.port, 9000);
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let err = ClauseCodeConfig::load_layered_with_options(
        isolated_options(temp.path()).with_runtime_path("absent.json5"),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}

#[test]
fn missing_optional_layers_yield_defaults() {
    let temp = TempDir::new().expect("tmp");
    let layered =
        ClauseCodeConfig::load_layered_with_options(isolated_options(temp.path())).expect("load");
    assert_eq!(layered.config, ClauseCodeConfig::default());
    assert_eq!(layered.layers.len(), 1);
}

#[test]
fn env_validation_runs_after_overrides() {
    let temp = TempDir::new().expect("tmp");
    let err = ClauseCodeConfig::load_layered_with_options(
        isolated_options(temp.path())
            .with_env(EnvOverrides::from_pairs([("CLAUSECODE_USE_DOCUMENTS", "nope")])),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnv { .. }));
}

#[test]
fn load_from_path_reads_single_file() {
    let temp = TempDir::new().expect("tmp");
    let path = temp.path().join("single.json5");
    write_json5(&path, r#"{ server: { host: "127.0.0.1" } }"#);
    let config = ClauseCodeConfig::load_from_path(&path).expect("config");
    assert_eq!(
        config,
        ClauseCodeConfig::builder()
            .server(ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5001,
            })
            .build()
    );
}
