//! Test helpers shared across ClauseCode crates.

pub mod backend;
pub mod fixtures;

pub use backend::{FailingBackend, MemoryBackend, ScriptedConnector, StalledBackend};
pub use fixtures::sample_analysis;
