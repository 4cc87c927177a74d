//! Environment variable overrides applied on top of file layers.

use crate::{ClauseCodeConfig, ConfigError};
use log::debug;
use std::collections::HashMap;

/// Variables set by managed platforms whose local disk is thrown away.
const EPHEMERAL_MARKERS: &[&str] = &["K_SERVICE", "RAILWAY_ENVIRONMENT_NAME"];

const HOST: &str = "HOST";
const PORT: &str = "PORT";
const DATABASE_PATH: &str = "CLAUSECODE_DATABASE_PATH";
const CSV_PATH: &str = "CLAUSECODE_CSV_PATH";
const USE_CSV: &str = "CLAUSECODE_USE_CSV";
const USE_DOCUMENTS: &str = "CLAUSECODE_USE_DOCUMENTS";

/// Snapshot of the environment variables the config understands.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    vars: HashMap<String, String>,
}

impl EnvOverrides {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Whether a managed-platform marker is present.
    pub fn is_ephemeral(&self) -> bool {
        EPHEMERAL_MARKERS.iter().any(|name| self.get(name).is_some())
    }

    /// Apply overrides to `config` in place.
    pub fn apply(&self, config: &mut ClauseCodeConfig) -> Result<(), ConfigError> {
        if self.is_ephemeral() {
            debug!("ephemeral deployment detected");
            config.deployment.ephemeral_filesystem = true;
        }
        if let Some(host) = self.get(HOST) {
            config.server.host = host.to_string();
        }
        if let Some(port) = self.get(PORT) {
            config.server.port = port
                .parse()
                .map_err(|_| invalid_env(PORT, port, "expected a port number"))?;
        }
        if let Some(path) = self.get(DATABASE_PATH) {
            config.storage.documents.path = Some(path.to_string());
        }
        if let Some(path) = self.get(CSV_PATH) {
            config.storage.flat_file.path = Some(path.to_string());
        }
        if let Some(value) = self.get(USE_CSV) {
            config.storage.flat_file.enabled = Some(parse_flag(USE_CSV, value)?);
        }
        if let Some(value) = self.get(USE_DOCUMENTS) {
            config.storage.documents.enabled = parse_flag(USE_DOCUMENTS, value)?;
        }
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(name, value, "expected true or false")),
    }
}

fn invalid_env(name: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}
