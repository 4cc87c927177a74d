//! Configuration models and layered config loading.
//!
//! This crate owns the ClauseCode config schema, validation, layer merging and
//! environment overrides used by the server binary.

mod env;
mod error;
mod loader;
mod model;

/// Deployment environment detection and overrides.
pub use env::EnvOverrides;
/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
