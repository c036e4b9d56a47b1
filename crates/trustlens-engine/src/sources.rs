//! Resolve configured sources into adapters
//!
//! Each source's [`SourceMode`] is looked at exactly once, here, at startup.
//! Secrets are read from the environment at the same moment and never again.

use crate::{ConfigError, SourceConfig};
use std::sync::Arc;
use tracing::{info, warn};
use trustlens_collector::{
    FallbackOnlyAdapter, FixtureAdapter, HttpJsonAdapter, SignalCollector, SourceAdapter,
};
use trustlens_domain::SourceMode;

/// Build the adapter for one configured source
pub fn build_adapter(source: &SourceConfig) -> Result<Arc<dyn SourceAdapter>, ConfigError> {
    let adapter: Arc<dyn SourceAdapter> = match source.mode {
        SourceMode::Live => {
            let base_url = source.base_url.as_deref().ok_or_else(|| {
                ConfigError::MissingField(format!("sources.{}.base_url", source.id))
            })?;
            let mut adapter =
                HttpJsonAdapter::new(source.id.as_str(), base_url).with_cost(source.cost_per_call);
            if let Some(var) = &source.api_key_env {
                match std::env::var(var) {
                    Ok(key) => adapter = adapter.with_api_key(key),
                    Err(_) => warn!(
                        "Source {}: {} is not set, requests go out unauthenticated",
                        source.id, var
                    ),
                }
            }
            Arc::new(adapter)
        }
        SourceMode::Fixture => {
            let path = source.fixture_path.as_ref().ok_or_else(|| {
                ConfigError::MissingField(format!("sources.{}.fixture_path", source.id))
            })?;
            let adapter = FixtureAdapter::from_file(source.id.as_str(), path, source.confidence)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            Arc::new(adapter)
        }
        SourceMode::FallbackOnly => Arc::new(FallbackOnlyAdapter::new(source.id.as_str())),
    };

    info!("Source {} resolved as {}", source.id, source.mode.as_str());
    Ok(adapter)
}

/// Register an adapter for every configured source
pub fn register_sources(
    collector: &mut SignalCollector,
    sources: &[SourceConfig],
) -> Result<(), ConfigError> {
    for source in sources {
        collector.register(build_adapter(source)?);
    }
    Ok(())
}
