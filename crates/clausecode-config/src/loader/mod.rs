//! Layered configuration loader.
//!
//! Discovers configuration layers (user, working directory, runtime), validates
//! their schema, merges them, applies environment overrides and produces the
//! final `ClauseCodeConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;

#[cfg(test)]
mod tests;

use crate::{ClauseCodeConfig, ConfigError, EnvOverrides};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "clausecode.json5";
/// Default config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".clausecode";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: ClauseCodeConfig,
    /// Metadata for each layer considered during load.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides passed on the command line.
    Runtime,
    /// Environment variables (highest precedence).
    Env,
}

/// Metadata about a config layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk if the layer is a file.
    pub path: Option<PathBuf>,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve relative paths and the cwd layer.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.clausecode/clausecode.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied after file discovery.
    pub runtime_paths: Vec<PathBuf>,
    /// Environment overrides applied last.
    pub env: EnvOverrides,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations and the process environment.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            env: EnvOverrides::from_process(),
        }
    }

    /// Add a runtime override config path.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Replace the environment snapshot.
    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }

    /// Replace or disable the user layer.
    pub fn with_user_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.user_config_path = path;
        self
    }
}

impl ClauseCodeConfig {
    /// Load a single config from a path (no layering, no environment).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering, no environment).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): user, cwd, runtime paths, environment.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());
        let mut seen_paths = HashSet::new();

        let discovered = [
            (ConfigLayerSource::User, options.user_config_path.clone()),
            (ConfigLayerSource::Cwd, Some(cwd.join(DEFAULT_CONFIG_FILE))),
        ];
        for (source, path) in discovered {
            let Some(path) = path else {
                continue;
            };
            if !seen_paths.insert(utils::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layer_io::load_optional_layer(source, &path)? {
                debug!("loaded {:?} layer", source);
                merge::merge_json_values(&mut merged, &layer.value);
                layers.push(layer.meta);
            }
        }

        for runtime_path in &options.runtime_paths {
            let path = cwd.join(runtime_path);
            let layer = layer_io::load_required_layer(ConfigLayerSource::Runtime, &path)?;
            debug!("loaded runtime layer (path={})", path.display());
            merge::merge_json_values(&mut merged, &layer.value);
            layers.push(layer.meta);
        }

        let mut config: ClauseCodeConfig = {
            schema::validate_layer_schema(&merged, "effective")?;
            serde_json::from_value(merged)?
        };
        options.env.apply(&mut config)?;
        layers.push(ConfigLayer {
            source: ConfigLayerSource::Env,
            path: None,
        });
        config.validate()?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let documents = &self.storage.documents;
        if documents.collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.documents.collection must not be empty".to_string(),
            ));
        }
        if documents.operation_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "storage.documents.operation_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.storage.list.overfetch_factor == 0 {
            return Err(ConfigError::Invalid(
                "storage.list.overfetch_factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<ClauseCodeConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: ClauseCodeConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
