//! Notification events published after state changes
//!
//! The set of payloads is closed and tagged by `type`; consumers match on
//! the variant instead of parsing a free-form envelope.

use crate::{CategoryScore, CycleId, EntityId, ProvenanceSummary, Snapshot, SourceId};
use serde::{Deserialize, Serialize};

/// Version of the `entity.trust.updated` payload
pub const EVENT_SCHEMA_VERSION: u32 = 1;

/// Every event the bus can carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrustEvent {
    /// A snapshot was committed for (entity, cycle)
    #[serde(rename = "entity.trust.updated")]
    TrustUpdated(UpdateEvent),
    /// An entity produced no snapshot this cycle
    #[serde(rename = "entity.cycle.skipped")]
    CycleSkipped(SkipNotice),
    /// A source failed with a non-retryable auth/config error
    #[serde(rename = "source.degraded")]
    SourceDegraded(DegradedNotice),
}

impl TrustEvent {
    /// Entity the event concerns, if any
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            TrustEvent::TrustUpdated(e) => Some(&e.entity_id),
            TrustEvent::CycleSkipped(e) => Some(&e.entity_id),
            TrustEvent::SourceDegraded(_) => None,
        }
    }

    /// Event type tag as it appears on the wire
    pub fn type_name(&self) -> &'static str {
        match self {
            TrustEvent::TrustUpdated(_) => "entity.trust.updated",
            TrustEvent::CycleSkipped(_) => "entity.cycle.skipped",
            TrustEvent::SourceDegraded(_) => "source.degraded",
        }
    }
}

/// Payload of `entity.trust.updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// Payload schema version
    pub schema_version: u32,
    /// Entity scored
    pub entity_id: EntityId,
    /// Cycle committed
    pub cycle_id: CycleId,
    /// Overall score [0, 100]
    pub overall: f64,
    /// Per-category scores
    pub category_breakdown: [CategoryScore; 5],
    /// Overall confidence
    pub confidence: f64,
    /// Evidence provenance
    pub provenance_summary: ProvenanceSummary,
    /// When the event was published (ms since epoch)
    pub published_at: u64,
}

impl UpdateEvent {
    /// Build the notification for a committed snapshot
    pub fn from_snapshot(snapshot: &Snapshot, published_at: u64) -> Self {
        let score = &snapshot.composite_score;
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            entity_id: snapshot.entity_id.clone(),
            cycle_id: snapshot.cycle_id,
            overall: score.overall,
            category_breakdown: score.category_breakdown,
            confidence: score.confidence,
            provenance_summary: score.provenance_summary.clone(),
            published_at,
        }
    }
}

/// Payload of `entity.cycle.skipped`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipNotice {
    /// Entity skipped
    pub entity_id: EntityId,
    /// Cycle in which it was skipped
    pub cycle_id: CycleId,
    /// Why
    pub reason: String,
    /// When the notice was published (ms since epoch)
    pub published_at: u64,
}

/// Payload of `source.degraded`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedNotice {
    /// Source that failed
    pub source_id: SourceId,
    /// Cycle in which it failed
    pub cycle_id: CycleId,
    /// Last error seen
    pub reason: String,
    /// When the notice was published (ms since epoch)
    pub published_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let event = TrustEvent::SourceDegraded(DegradedNotice {
            source_id: SourceId::new("license-registry"),
            cycle_id: CycleId::from_value(3),
            reason: "401 unauthorized".to_string(),
            published_at: 99,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "source.degraded");
        assert_eq!(value["source_id"], "license-registry");
        assert!(event.entity_id().is_none());

        let back: TrustEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_skip_notice_has_entity() {
        let event = TrustEvent::CycleSkipped(SkipNotice {
            entity_id: EntityId::new("casino-a"),
            cycle_id: CycleId::from_value(3),
            reason: "no evidence".to_string(),
            published_at: 1,
        });
        assert_eq!(event.entity_id().map(|e| e.as_str()), Some("casino-a"));
        assert_eq!(event.type_name(), "entity.cycle.skipped");
    }
}
