//! Source adapter contract
//!
//! Every external data source (scraper, extraction service, fixture file)
//! sits behind [`SourceAdapter`]. The collector only ever talks to this
//! trait; which implementation backs a source is decided once, at startup,
//! from its configured `SourceMode`.

use crate::SourceError;
use async_trait::async_trait;
use std::time::Duration;
use trustlens_domain::{EntityId, SignalResult, SignalType, SourceId};

/// Fetches one signal for one entity from one source
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source this adapter serves
    fn source_id(&self) -> &SourceId;

    /// Fetch a fresh signal
    ///
    /// Implementations must not block past `timeout`; the collector also
    /// enforces it.
    async fn fetch(
        &self,
        entity_id: &EntityId,
        signal_type: SignalType,
        timeout: Duration,
    ) -> Result<SignalResult, SourceError>;

    /// Whether results may be cached and served from cache
    fn supports_caching(&self) -> bool {
        true
    }

    /// Relative cost of one call, for budgeting and reporting
    fn cost_per_call(&self) -> f64 {
        0.0
    }

    /// Never call this source; go straight to cache-or-fallback
    fn force_fallback(&self) -> bool {
        false
    }
}

/// Adapter for sources configured as `fallback_only`
///
/// Never fetches anything. The collector serves cached values when present
/// and neutral fallbacks otherwise.
#[derive(Debug, Clone)]
pub struct FallbackOnlyAdapter {
    source_id: SourceId,
}

impl FallbackOnlyAdapter {
    /// Create a fallback-only adapter for a source
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: SourceId::new(source_id),
        }
    }
}

#[async_trait]
impl SourceAdapter for FallbackOnlyAdapter {
    fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    async fn fetch(
        &self,
        _entity_id: &EntityId,
        signal_type: SignalType,
        _timeout: Duration,
    ) -> Result<SignalResult, SourceError> {
        Err(SourceError::Config(format!(
            "source {} is fallback-only and cannot fetch {}",
            self.source_id, signal_type
        )))
    }

    fn force_fallback(&self) -> bool {
        true
    }
}
