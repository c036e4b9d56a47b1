//! Configuration for the signal collector

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Fetch policy for one collection cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Adapter calls in flight at once, across all entities and sources
    pub max_concurrency: usize,

    /// Per-fetch timeout (milliseconds)
    pub source_timeout_ms: u64,

    /// Retries after the first attempt for timeouts and transient failures
    pub max_retries: u32,

    /// First backoff delay (milliseconds); doubles per retry
    pub backoff_base_ms: u64,

    /// Backoff ceiling (milliseconds)
    pub backoff_max_ms: u64,

    /// How long a live result may be served from cache (seconds)
    pub cache_ttl_secs: u64,

    /// Confidence attached to a neutral fallback
    pub fallback_confidence: f64,
}

impl CollectorConfig {
    /// Per-fetch timeout as a Duration
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Cache TTL as a Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.backoff_base_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.backoff_max_ms))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(format!(
                "max_concurrency cannot exceed {}",
                Semaphore::MAX_PERMITS
            ));
        }
        if self.source_timeout_ms == 0 {
            return Err("source_timeout_ms must be greater than 0".to_string());
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err("backoff_base_ms cannot exceed backoff_max_ms".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.fallback_confidence) {
            return Err("fallback_confidence must be within [0.0, 1.0]".to_string());
        }
        Ok(())
    }

    /// Aggressive preset: fail fast, few retries, short-lived cache
    pub fn aggressive() -> Self {
        Self {
            max_concurrency: 16,
            source_timeout_ms: 2_000,
            max_retries: 1,
            backoff_base_ms: 100,
            backoff_max_ms: 1_000,
            cache_ttl_secs: 6 * 3600,
            fallback_confidence: 0.1,
        }
    }

    /// Lenient preset: patient with slow or flaky sources
    pub fn lenient() -> Self {
        Self {
            max_concurrency: 4,
            source_timeout_ms: 15_000,
            max_retries: 4,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            cache_ttl_secs: 7 * 86_400,
            fallback_confidence: 0.3,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            source_timeout_ms: 5_000,
            max_retries: 2,
            backoff_base_ms: 200,
            backoff_max_ms: 5_000,
            cache_ttl_secs: 86_400,
            fallback_confidence: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(CollectorConfig::default().validate().is_ok());
        assert!(CollectorConfig::aggressive().validate().is_ok());
        assert!(CollectorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = CollectorConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_concurrency_rejected() {
        let config = CollectorConfig {
            max_concurrency: Semaphore::MAX_PERMITS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CollectorConfig {
            max_concurrency: Semaphore::MAX_PERMITS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fallback_confidence_range() {
        let config = CollectorConfig {
            fallback_confidence: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = CollectorConfig::default();
        assert_eq!(config.backoff(0), Duration::from_millis(200));
        assert_eq!(config.backoff(1), Duration::from_millis(400));
        assert_eq!(config.backoff(2), Duration::from_millis(800));
        assert_eq!(config.backoff(10), Duration::from_millis(5_000));
        assert_eq!(config.backoff(200), Duration::from_millis(5_000));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CollectorConfig::from_toml("max_retries = 5\n").unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CollectorConfig::lenient();
        let parsed = CollectorConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }
}
