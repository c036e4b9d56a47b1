//! Engine configuration loaded from TOML
//!
//! ```toml
//! [engine]
//! cycle_interval_secs = 3600
//! database_path = "trustlens.db"
//! bus_capacity = 256
//!
//! [collector]
//! max_concurrency = 8
//!
//! [[sources]]
//! id = "complaint-board"
//! mode = "live"
//! base_url = "https://signals.example.com"
//! api_key_env = "COMPLAINT_BOARD_KEY"
//!
//! [[entities]]
//! id = "casino-a"
//! display_name = "Casino A"
//! bindings = [{ source = "complaint-board", signals = ["complaints"] }]
//! ```
//!
//! `[scoring]` may be omitted to use the default policy; when present it must
//! be complete.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use trustlens_collector::CollectorConfig;
use trustlens_domain::{SourceMode, TrackedEntity};
use trustlens_rollup::DEFAULT_CAPACITY;
use trustlens_scoring::ScoringConfig;

/// Engine configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// A value is present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// `[engine]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Seconds between scheduled cycles
    pub cycle_interval_secs: u64,

    /// SQLite snapshot database
    pub database_path: PathBuf,

    /// Events buffered per subscriber before the slowest starts missing them
    pub bus_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cycle_interval_secs: 3600,
            database_path: PathBuf::from("trustlens.db"),
            bus_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl EngineSettings {
    /// Cycle interval as a Duration
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }
}

/// One `[[sources]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source identifier referenced by entity bindings
    pub id: String,

    /// How the source gets its data
    #[serde(default)]
    pub mode: SourceMode,

    /// Extraction service root (live mode)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key (live mode)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Recorded payloads (fixture mode)
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,

    /// Confidence attached to fixture payloads
    #[serde(default = "default_fixture_confidence")]
    pub confidence: f64,

    /// Cost reported per adapter call
    #[serde(default)]
    pub cost_per_call: f64,
}

fn default_fixture_confidence() -> f64 {
    0.9
}

impl SourceConfig {
    /// A source that never calls out
    pub fn fallback_only(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode: SourceMode::FallbackOnly,
            base_url: None,
            api_key_env: None,
            fixture_path: None,
            confidence: default_fixture_confidence(),
            cost_per_call: 0.0,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingField("sources.id".to_string()));
        }
        match self.mode {
            SourceMode::Live if self.base_url.is_none() => Err(ConfigError::MissingField(
                format!("sources.{}.base_url", self.id),
            )),
            SourceMode::Fixture if self.fixture_path.is_none() => Err(ConfigError::MissingField(
                format!("sources.{}.fixture_path", self.id),
            )),
            _ if !(0.0..=1.0).contains(&self.confidence) => Err(ConfigError::Invalid(format!(
                "sources.{}.confidence must be between 0.0 and 1.0",
                self.id
            ))),
            _ if self.cost_per_call < 0.0 => Err(ConfigError::Invalid(format!(
                "sources.{}.cost_per_call cannot be negative",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scheduling, storage and bus settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Fetch policy
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Scoring policy
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Evidence sources
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Entities scored each cycle, in processing order
    #[serde(default)]
    pub entities: Vec<TrackedEntity>,
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section and the references between them
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.cycle_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "engine.cycle_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.engine.bus_capacity == 0 {
            return Err(ConfigError::Invalid(
                "engine.bus_capacity must be greater than 0".to_string(),
            ));
        }
        if self.engine.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("engine.database_path".to_string()));
        }

        self.collector
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("collector: {}", e)))?;
        self.scoring
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("scoring: {}", e)))?;

        let mut source_ids = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !source_ids.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "source '{}' is defined twice",
                    source.id
                )));
            }
        }

        let mut entity_ids = HashSet::new();
        for entity in &self.entities {
            if entity.id.as_str().trim().is_empty() {
                return Err(ConfigError::MissingField("entities.id".to_string()));
            }
            if !entity_ids.insert(&entity.id) {
                return Err(ConfigError::Invalid(format!(
                    "entity '{}' is defined twice",
                    entity.id
                )));
            }
            for binding in &entity.bindings {
                if !source_ids.contains(binding.source.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "entity '{}' is bound to unknown source '{}'",
                        entity.id, binding.source
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustlens_domain::SignalType;

    const SAMPLE: &str = r#"
        [engine]
        cycle_interval_secs = 600
        database_path = "/tmp/trustlens-test.db"

        [collector]
        max_concurrency = 4
        max_retries = 1

        [[sources]]
        id = "reviews"
        mode = "fixture"
        fixture_path = "fixtures/reviews.json"
        confidence = 0.85

        [[sources]]
        id = "regulator"
        mode = "live"
        base_url = "https://regulator.example.com"
        api_key_env = "REGULATOR_KEY"
        cost_per_call = 0.01

        [[sources]]
        id = "paid-audit"
        mode = "fallback_only"

        [[entities]]
        id = "casino-a"
        display_name = "Casino A"
        bindings = [
            { source = "reviews", signals = ["payout_times", "complaints"] },
            { source = "regulator", signals = ["license_status"] },
        ]

        [[entities]]
        id = "casino-b"
        display_name = "Casino B"
    "#;

    #[test]
    fn test_parse_sample() {
        let config = EngineConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.engine.cycle_interval(), Duration::from_secs(600));
        assert_eq!(config.engine.bus_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.collector.max_concurrency, 4);
        assert_eq!(config.collector.max_retries, 1);
        // Untouched collector fields keep their defaults
        assert_eq!(config.collector.source_timeout_ms, 5000);
        assert_eq!(config.scoring, ScoringConfig::default());

        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[0].mode, SourceMode::Fixture);
        assert_eq!(config.sources[1].api_key_env.as_deref(), Some("REGULATOR_KEY"));
        assert_eq!(config.sources[2].mode, SourceMode::FallbackOnly);
        assert_eq!(config.sources[2].confidence, 0.9);

        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.entities[0].bindings.len(), 2);
        assert_eq!(
            config.entities[0].bindings[0].signals,
            vec![SignalType::PayoutTimes, SignalType::Complaints]
        );
        assert!(config.entities[1].bindings.is_empty());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config =
            EngineConfig::from_toml(include_str!("../../../config/trustlens.example.toml")).unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.entities[0].fetch_count(), 9);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_live_source_requires_base_url() {
        let result = EngineConfig::from_toml(
            r#"
            [[sources]]
            id = "regulator"
            mode = "live"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::MissingField(f)) if f == "sources.regulator.base_url"));
    }

    #[test]
    fn test_fixture_source_requires_path() {
        let result = EngineConfig::from_toml(
            r#"
            [[sources]]
            id = "reviews"
            mode = "fixture"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let mut config = EngineConfig::default();
        config.sources.push(SourceConfig::fallback_only("a"));
        config.sources.push(SourceConfig::fallback_only("a"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut config = EngineConfig::default();
        config.entities.push(TrackedEntity::new("casino-a", "A"));
        config.entities.push(TrackedEntity::new("casino-a", "A again"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_binding_to_unknown_source_rejected() {
        let result = EngineConfig::from_toml(
            r#"
            [[entities]]
            id = "casino-a"
            display_name = "Casino A"
            bindings = [{ source = "nowhere", signals = ["complaints"] }]
            "#,
        );
        match result {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("nowhere")),
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = EngineConfig::default();
        config.engine.cycle_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_collector_section_rejected() {
        let result = EngineConfig::from_toml(
            r#"
            [collector]
            max_concurrency = 0
            "#,
        );
        match result {
            Err(ConfigError::Invalid(msg)) => assert!(msg.starts_with("collector:")),
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_concurrency_is_config_error() {
        let result = EngineConfig::from_toml(
            r#"
            [collector]
            max_concurrency = 4611686018427387904
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_signal_type_is_parse_error() {
        let result = EngineConfig::from_toml(
            r#"
            [[sources]]
            id = "reviews"
            mode = "fallback_only"

            [[entities]]
            id = "casino-a"
            display_name = "Casino A"
            bindings = [{ source = "reviews", signals = ["horoscope"] }]
            "#,
        );
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = EngineConfig::from_file("/nonexistent/trustlens.toml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }
}
