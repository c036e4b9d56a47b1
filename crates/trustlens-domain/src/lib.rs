//! TrustLens Domain Layer
//!
//! This crate contains the core data model for TrustLens and the trait
//! boundaries the other crates implement. It carries no I/O and no async
//! runtime; persistence and collection live in infrastructure crates.
//!
//! ## Key Concepts
//!
//! - **Entity**: a tracked platform being scored
//! - **Signal**: one piece of raw evidence about an entity from one source
//! - **Metric**: one fairness/quality dimension computed from signals
//! - **Composite Score**: the weighted aggregate of all metrics for a cycle
//! - **Snapshot**: the immutable, durable result of a cycle for an entity
//! - **Provenance**: whether a value came from a live fetch, cache, or fallback
//!
//! ## Architecture
//!
//! - Pure data types with serde derives (snapshots and events are JSON on
//!   the wire and on disk)
//! - Trait definitions for storage; implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod confidence;
pub mod cycle;
pub mod entity;
pub mod event;
pub mod metric;
pub mod provenance;
pub mod score;
pub mod signal;
pub mod snapshot;
pub mod traits;

// Re-exports for convenience
pub use category::MetricCategory;
pub use cycle::{now_millis, CycleId, CycleOutcome, CycleRecord, CycleTrigger};
pub use entity::{EntityId, SourceBinding, SourceId, SourceMode, TrackedEntity};
pub use event::{DegradedNotice, SkipNotice, TrustEvent, UpdateEvent};
pub use metric::{Metric, MetricKind};
pub use provenance::{Provenance, ProvenanceSummary};
pub use score::{CategoryScore, CompositeScore, RationaleEntry};
pub use signal::{SignalResult, SignalType};
pub use snapshot::{Snapshot, SCHEMA_VERSION};
