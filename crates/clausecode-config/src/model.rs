//! Configuration schema for ClauseCode.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Filename of the CSV audit log when no path is configured.
pub const DEFAULT_CSV_FILE: &str = "analysis_data.csv";

/// Root config for the ClauseCode backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClauseCodeConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ClauseCodeConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ClauseCodeConfigBuilder {
        ClauseCodeConfigBuilder::new()
    }
}

/// Builder for assembling a `ClauseCodeConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ClauseCodeConfigBuilder {
    config: ClauseCodeConfig,
}

impl ClauseCodeConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClauseCodeConfig::default(),
        }
    }

    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    pub fn deployment(mut self, deployment: DeploymentConfig) -> Self {
        self.config.deployment = deployment;
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn build(self) -> ClauseCodeConfig {
        self.config
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

/// Facts about where the process runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DeploymentConfig {
    /// Local files do not survive restarts (managed container platforms).
    #[serde(default)]
    pub ephemeral_filesystem: bool,
}

/// Storage backends and list behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub documents: DocumentStoreConfig,
    #[serde(default)]
    pub flat_file: FlatFileConfig,
    #[serde(default)]
    pub list: ListConfig,
}

/// Queryable document store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentStoreConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Database file; the per-user data directory is used when unset.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            collection: default_collection(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_collection() -> String {
    "clausecode_analyses".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    10_000
}

/// CSV audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FlatFileConfig {
    /// Explicit toggle; unset means "enabled unless the filesystem is ephemeral".
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub path: Option<String>,
}

impl FlatFileConfig {
    /// Whether the audit log should be written for this deployment.
    pub fn is_enabled(&self, deployment: &DeploymentConfig) -> bool {
        self.enabled.unwrap_or(!deployment.ephemeral_filesystem)
    }

    /// Audit log location: explicit path, else the working directory, else the
    /// temp directory on ephemeral deployments.
    pub fn resolved_path(&self, deployment: &DeploymentConfig, cwd: &Path) -> PathBuf {
        if let Some(path) = &self.path {
            return cwd.join(path);
        }
        if deployment.ephemeral_filesystem {
            std::env::temp_dir().join(DEFAULT_CSV_FILE)
        } else {
            cwd.join(DEFAULT_CSV_FILE)
        }
    }
}

/// List endpoint defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListConfig {
    #[serde(default = "default_list_limit")]
    pub default_limit: usize,
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: default_list_limit(),
            overfetch_factor: default_overfetch_factor(),
        }
    }
}

fn default_list_limit() -> usize {
    50
}

fn default_overfetch_factor() -> usize {
    10
}
