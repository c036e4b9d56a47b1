//! Error types for source adapters

use thiserror::Error;

/// Errors a source adapter can return for one fetch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The fetch did not finish within its timeout
    #[error("Source timeout after {0} ms")]
    Timeout(u64),

    /// Credentials rejected or missing
    #[error("Source authentication failed: {0}")]
    Auth(String),

    /// Temporary failure (network, rate limit, 5xx)
    #[error("Transient source failure: {0}")]
    Transient(String),

    /// Source misconfigured or unknown
    #[error("Source configuration error: {0}")]
    Config(String),

    /// Source answered but the payload is unusable
    #[error("Extraction failure: {0}")]
    Extraction(String),
}

impl SourceError {
    /// Worth retrying with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Timeout(_) | SourceError::Transient(_))
    }

    /// Marks the source degraded for operators
    pub fn is_degrading(&self) -> bool {
        matches!(self, SourceError::Auth(_) | SourceError::Config(_))
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Extraction(e.to_string())
    }
}
