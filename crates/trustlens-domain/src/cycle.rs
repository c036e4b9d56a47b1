//! Cycle identity and per-entity cycle bookkeeping

use crate::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Unique identifier for a collection-and-scoring cycle, based on UUIDv7
///
/// UUIDv7 gives:
/// - Chronological sortability, so "later cycle" is plain `Ord`
/// - No coordination required between restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CycleId(u128);

impl CycleId {
    /// Generate a new UUIDv7-based CycleId
    ///
    /// # Examples
    ///
    /// ```
    /// use trustlens_domain::CycleId;
    ///
    /// let id = CycleId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a CycleId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization and tests.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a CycleId from its UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid cycle id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Milliseconds since Unix epoch encoded in the UUIDv7 prefix
    pub fn timestamp(&self) -> u64 {
        (self.0 >> 80) as u64
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl From<CycleId> for String {
    fn from(id: CycleId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for CycleId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_string(&s)
    }
}

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTrigger {
    /// Fired by the worker's interval timer
    Scheduled,
    /// Requested by an operator or consumer
    Manual,
}

impl CycleTrigger {
    /// Get the trigger name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleTrigger::Scheduled => "scheduled",
            CycleTrigger::Manual => "manual",
        }
    }
}

/// What happened to one entity in one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// A snapshot was committed and the latest pointer advanced
    Committed,
    /// No usable evidence; latest pointer left unchanged
    Skipped {
        /// Why the entity was skipped
        reason: String,
    },
    /// Scoring or the snapshot write failed for this entity only
    Failed {
        /// Error message
        error: String,
    },
    /// The cycle was cancelled before this entity was committed
    Aborted,
}

impl CycleOutcome {
    /// Short outcome label used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Committed => "committed",
            CycleOutcome::Skipped { .. } => "skipped",
            CycleOutcome::Failed { .. } => "failed",
            CycleOutcome::Aborted => "aborted",
        }
    }
}

/// Audit record of one entity's outcome in one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Cycle identifier
    pub cycle_id: CycleId,
    /// Entity the record is about
    pub entity_id: EntityId,
    /// What started the cycle
    pub trigger: CycleTrigger,
    /// Outcome for this entity
    #[serde(flatten)]
    pub outcome: CycleOutcome,
    /// When the record was written (ms since epoch)
    pub recorded_at: u64,
}
