//! TrustLens Signal Collector
//!
//! Gathers raw evidence for a scoring cycle.
//!
//! # Architecture
//!
//! - [`SourceAdapter`]: the capability interface every source implements
//!   (`fetch`, `supports_caching`, `cost_per_call`, `force_fallback`)
//! - [`SignalCache`]: TTL cache of live results with staleness decay
//! - [`SignalCollector`]: bounded-concurrency, single-flight collection with
//!   retry, cache-or-fallback and degraded-source tracking
//!
//! # Adapters
//!
//! - [`HttpJsonAdapter`]: JSON-over-HTTP extraction service (`live` mode)
//! - [`FixtureAdapter`]: JSON fixture file (`fixture` mode)
//! - [`FallbackOnlyAdapter`]: never fetches (`fallback_only` mode)
//! - [`MockAdapter`]: scripted adapter for tests

#![warn(missing_docs)]

mod adapter;
mod cache;
mod collector;
mod config;
mod error;
mod fixture;
mod flight;
mod http;
mod mock;

pub use adapter::{FallbackOnlyAdapter, SourceAdapter};
pub use cache::{cache_key, SignalCache};
pub use collector::{CollectionStats, CycleSignals, EntitySignals, SignalCollector};
pub use config::CollectorConfig;
pub use error::SourceError;
pub use fixture::FixtureAdapter;
pub use http::{classify_status, HttpJsonAdapter};
pub use mock::MockAdapter;
