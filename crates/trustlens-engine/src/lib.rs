//! TrustLens Engine
//!
//! Drives collection-and-scoring cycles and hosts the `trustlens` binary.
//!
//! # Overview
//!
//! A cycle collects every bound signal for every tracked entity, scores each
//! entity, commits one snapshot per entity and publishes an update event
//! after each commit. The engine is responsible for:
//! - **Assembly**: turning [`EngineConfig`] into adapters, a collector, a
//!   snapshot store and a rehydrated rollup
//! - **Cycles**: [`CycleRunner::run_cycle`], one at a time, cancellable
//! - **Scheduling**: [`CycleWorker`] runs cycles on an interval and on manual
//!   triggers from a [`WorkerHandle`]
//! - **Metrics**: [`EngineMetrics`] totals across cycles
//!
//! # Per-entity outcomes
//!
//! | Outcome | When | Snapshot | Event |
//! |---------|------|----------|-------|
//! | committed | any live or cached evidence | written, latest advances | `entity.trust.updated` |
//! | skipped | only fallbacks (or no bindings) | none, latest unchanged | `entity.cycle.skipped` |
//! | failed | snapshot write rejected | none | none |
//! | aborted | cycle cancelled before the entity | none | none |
//!
//! Every outcome is written to the cycle log.
//!
//! # Usage
//!
//! ```no_run
//! use trustlens_engine::{build_runner, EngineConfig};
//! use trustlens_domain::CycleTrigger;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::from_file("trustlens.toml")?;
//! let runner = build_runner(&config)?;
//!
//! let report = runner
//!     .run_cycle(CycleTrigger::Manual, &CancellationToken::new())
//!     .await;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod bootstrap;
mod cli;
mod config;
mod cycle;
mod error;
mod metrics;
mod sources;
mod worker;

pub use bootstrap::{build_runner, open_rollup, SqliteCycleRunner};
pub use cli::{format_history, format_report, format_score, Cli, Command};
pub use config::{ConfigError, EngineConfig, EngineSettings, SourceConfig};
pub use cycle::{CycleReport, CycleRunner};
pub use error::EngineError;
pub use metrics::EngineMetrics;
pub use sources::{build_adapter, register_sources};
pub use worker::{CycleWorker, WorkerHandle};
