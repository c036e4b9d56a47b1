//! Fixture-backed adapter for `fixture` mode sources
//!
//! Reads a JSON document of the form
//!
//! ```json
//! {
//!   "casino-a": {
//!     "payout_times": { "median_hours": 20.0 },
//!     "complaints": { "total": 3, "unresolved": 0, "payout_related": 1, "lookback_days": 90 }
//!   }
//! }
//! ```
//!
//! once at startup and serves it as live data.

use crate::{SourceAdapter, SourceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use trustlens_domain::{now_millis, EntityId, SignalResult, SignalType, SourceId};

/// Serves signals from a JSON fixture file
#[derive(Debug, Clone)]
pub struct FixtureAdapter {
    source_id: SourceId,
    confidence: f64,
    data: HashMap<(EntityId, SignalType), serde_json::Value>,
}

impl FixtureAdapter {
    /// Parse fixture data from a JSON string
    pub fn from_json_str(
        source_id: impl Into<String>,
        json: &str,
        confidence: f64,
    ) -> Result<Self, SourceError> {
        let source_id = SourceId::new(source_id);
        let raw: HashMap<String, HashMap<String, serde_json::Value>> = serde_json::from_str(json)
            .map_err(|e| SourceError::Config(format!("invalid fixture for {}: {}", source_id, e)))?;

        let mut data = HashMap::new();
        for (entity, signals) in raw {
            for (name, payload) in signals {
                let signal_type = SignalType::parse(&name).ok_or_else(|| {
                    SourceError::Config(format!(
                        "unknown signal type '{}' in fixture for {}",
                        name, source_id
                    ))
                })?;
                data.insert((EntityId::new(entity.as_str()), signal_type), payload);
            }
        }

        Ok(Self {
            source_id,
            confidence,
            data,
        })
    }

    /// Load fixture data from a file
    pub fn from_file(
        source_id: impl Into<String>,
        path: impl AsRef<Path>,
        confidence: f64,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SourceError::Config(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        let adapter = Self::from_json_str(source_id, &json, confidence)?;
        info!(
            "Loaded {} fixture signals for source {} from {}",
            adapter.data.len(),
            adapter.source_id,
            path.display()
        );
        Ok(adapter)
    }

    /// Number of (entity, signal type) pairs available
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the fixture holds no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl SourceAdapter for FixtureAdapter {
    fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    async fn fetch(
        &self,
        entity_id: &EntityId,
        signal_type: SignalType,
        _timeout: Duration,
    ) -> Result<SignalResult, SourceError> {
        let payload = self
            .data
            .get(&(entity_id.clone(), signal_type))
            .cloned()
            .ok_or_else(|| {
                SourceError::Extraction(format!(
                    "fixture {} has no {} for {}",
                    self.source_id, signal_type, entity_id
                ))
            })?;

        Ok(SignalResult::live(
            self.source_id.clone(),
            entity_id.clone(),
            signal_type,
            payload,
            self.confidence,
            now_millis(),
        ))
    }

    fn supports_caching(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "casino-a": {
            "payout_times": { "median_hours": 20.0 },
            "license_status": { "licensed": true, "regulator_tier": 1 }
        }
    }"#;

    #[tokio::test]
    async fn test_serves_fixture_payload() {
        let adapter = FixtureAdapter::from_json_str("fixtures", FIXTURE, 0.8).unwrap();
        assert_eq!(adapter.len(), 2);

        let result = adapter
            .fetch(&"casino-a".into(), SignalType::PayoutTimes, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result.payload["median_hours"], 20.0);
        assert_eq!(result.confidence, 0.8);
        assert!(!adapter.supports_caching());
    }

    #[tokio::test]
    async fn test_missing_entry_is_extraction_failure() {
        let adapter = FixtureAdapter::from_json_str("fixtures", FIXTURE, 0.8).unwrap();
        let err = adapter
            .fetch(&"casino-b".into(), SignalType::PayoutTimes, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Extraction(_)));
    }

    #[test]
    fn test_unknown_signal_type_rejected() {
        let err = FixtureAdapter::from_json_str("fixtures", r#"{"a": {"vibes": 1}}"#, 0.8)
            .unwrap_err();
        assert!(matches!(err, SourceError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let adapter = FixtureAdapter::from_file("fixtures", file.path(), 0.7).unwrap();
        assert_eq!(adapter.len(), 2);
        assert!(FixtureAdapter::from_file("fixtures", "/no/such/file.json", 0.7).is_err());
    }
}
