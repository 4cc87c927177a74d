//! Schema validation helpers for ClauseCode JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(
        map,
        &["$schema", "server", "deployment", "storage"],
        layer,
        "",
    )?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("server") {
        validate_server(value, layer, "server")?;
    }
    if let Some(value) = map.get("deployment") {
        let map = expect_object(value, layer, "deployment")?;
        ensure_allowed_keys(map, &["ephemeral_filesystem"], layer, "deployment")?;
        if let Some(value) = map.get("ephemeral_filesystem") {
            expect_bool(value, layer, "deployment.ephemeral_filesystem")?;
        }
    }
    if let Some(value) = map.get("storage") {
        validate_storage(value, layer, "storage")?;
    }

    Ok(())
}

/// Validate the "server" block.
fn validate_server(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["host", "port"], layer, path)?;
    if let Some(value) = map.get("host") {
        expect_string(value, layer, &join_path(path, "host"))?;
    }
    if let Some(value) = map.get("port") {
        let port_path = join_path(path, "port");
        match value.as_u64() {
            Some(port) if port <= u64::from(u16::MAX) => {}
            _ => return Err(invalid_field(layer, &port_path, "expected port number")),
        }
    }
    Ok(())
}

/// Validate the "storage" block.
fn validate_storage(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["documents", "flat_file", "list"], layer, path)?;

    if let Some(value) = map.get("documents") {
        let path = join_path(path, "documents");
        let map = expect_object(value, layer, &path)?;
        ensure_allowed_keys(
            map,
            &["enabled", "path", "collection", "operation_timeout_ms"],
            layer,
            &path,
        )?;
        if let Some(value) = map.get("enabled") {
            expect_bool(value, layer, &join_path(&path, "enabled"))?;
        }
        if let Some(value) = map.get("path") {
            expect_optional_string(value, layer, &join_path(&path, "path"))?;
        }
        if let Some(value) = map.get("collection") {
            expect_string(value, layer, &join_path(&path, "collection"))?;
        }
        if let Some(value) = map.get("operation_timeout_ms") {
            expect_u64(value, layer, &join_path(&path, "operation_timeout_ms"))?;
        }
    }

    if let Some(value) = map.get("flat_file") {
        let path = join_path(path, "flat_file");
        let map = expect_object(value, layer, &path)?;
        ensure_allowed_keys(map, &["enabled", "path"], layer, &path)?;
        if let Some(value) = map.get("enabled").filter(|value| !value.is_null()) {
            expect_bool(value, layer, &join_path(&path, "enabled"))?;
        }
        if let Some(value) = map.get("path") {
            expect_optional_string(value, layer, &join_path(&path, "path"))?;
        }
    }

    if let Some(value) = map.get("list") {
        let path = join_path(path, "list");
        let map = expect_object(value, layer, &path)?;
        ensure_allowed_keys(map, &["default_limit", "overfetch_factor"], layer, &path)?;
        if let Some(value) = map.get("default_limit") {
            expect_u64(value, layer, &join_path(&path, "default_limit"))?;
        }
        if let Some(value) = map.get("overfetch_factor") {
            expect_u64(value, layer, &join_path(&path, "overfetch_factor"))?;
        }
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

fn expect_optional_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_null() {
        return Ok(());
    }
    expect_string(value, layer, path)
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Expect a non-negative JSON integer or return a typed error.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Ensure the map only contains allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
