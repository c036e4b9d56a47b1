//! Tracked entities and their source bindings

use crate::SignalType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a tracked entity (e.g., "casino:lucky-spin")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a configured evidence source (e.g., "complaint-board")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How a source obtains its data, resolved once at startup
///
/// Business logic never branches on "mock or real"; the engine turns each
/// configured mode into a concrete adapter before the first cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Fetch from the real upstream
    #[default]
    Live,
    /// Serve recorded payloads from a fixture file
    Fixture,
    /// Never call out; always cache-or-fallback (cost control)
    FallbackOnly,
}

impl SourceMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Live => "live",
            SourceMode::Fixture => "fixture",
            SourceMode::FallbackOnly => "fallback_only",
        }
    }
}

/// One source an entity is scored from, and which signals it provides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBinding {
    /// Source to fetch from
    pub source: SourceId,
    /// Signal types requested from that source
    pub signals: Vec<SignalType>,
}

impl SourceBinding {
    /// Create a binding
    pub fn new(source: impl Into<String>, signals: Vec<SignalType>) -> Self {
        Self {
            source: SourceId::new(source),
            signals,
        }
    }
}

/// A platform being scored
///
/// Created at configuration time and rarely mutated. Entities referenced by
/// snapshots are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntity {
    /// Unique identifier
    pub id: EntityId,
    /// Human-readable name
    pub display_name: String,
    /// Sources this entity is scored from
    #[serde(default)]
    pub bindings: Vec<SourceBinding>,
}

impl TrackedEntity {
    /// Create an entity with no bindings
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(id),
            display_name: display_name.into(),
            bindings: Vec::new(),
        }
    }

    /// Add a source binding
    pub fn with_binding(mut self, binding: SourceBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Number of (source, signal) fetches this entity needs per cycle
    pub fn fetch_count(&self) -> usize {
        self.bindings.iter().map(|b| b.signals.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder() {
        let entity = TrackedEntity::new("casino-a", "Casino A")
            .with_binding(SourceBinding::new(
                "audits",
                vec![SignalType::DisclosedRate, SignalType::ObservedRate],
            ))
            .with_binding(SourceBinding::new("complaints", vec![SignalType::Complaints]));

        assert_eq!(entity.id.as_str(), "casino-a");
        assert_eq!(entity.bindings.len(), 2);
        assert_eq!(entity.fetch_count(), 3);
    }

    #[test]
    fn test_source_mode_serde() {
        let mode: SourceMode = serde_json::from_str("\"fallback_only\"").unwrap();
        assert_eq!(mode, SourceMode::FallbackOnly);
        assert_eq!(SourceMode::default(), SourceMode::Live);
    }
}
