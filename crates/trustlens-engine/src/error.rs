//! Error types for the engine

use crate::ConfigError;
use thiserror::Error;
use trustlens_rollup::{QueryError, RollupError};
use trustlens_scoring::ScoringConfigError;
use trustlens_store::StoreError;

/// Errors raised while assembling or driving the engine
///
/// Nothing here is raised for a single entity's failure inside a cycle;
/// those end up in the cycle report.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scoring policy rejected
    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringConfigError),

    /// Snapshot store could not be opened
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Rollup could not be opened or rehydrated
    #[error("Rollup error: {0}")]
    Rollup(#[from] RollupError),

    /// Pull query failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Worker is gone or stopped before answering
    #[error("Worker error: {0}")]
    Worker(String),
}
