//! TrustLens Rollup
//!
//! Distributes committed trust scores to consumers.
//!
//! # Architecture
//!
//! - [`EventBus`]: explicit in-process broadcast of closed, tagged
//!   [`TrustEvent`](trustlens_domain::TrustEvent)s
//! - [`Rollup`]: commits snapshots through a [`SnapshotStore`], keeps an
//!   in-memory latest-state cache rehydrated from that store, publishes
//!   after commit, and answers pull queries
//!
//! Push delivery is best-effort. A consumer that misses events (slow,
//! disconnected) reconciles with [`Rollup::latest_score`], which always
//! reflects the most recently committed snapshot.
//!
//! [`SnapshotStore`]: trustlens_domain::traits::SnapshotStore

#![warn(missing_docs)]

mod bus;
mod error;
mod rollup;

pub use bus::{EventBus, Subscription, DEFAULT_CAPACITY};
pub use error::{EventPublishError, QueryError, RollupError};
pub use rollup::{CommitReceipt, Rollup};
