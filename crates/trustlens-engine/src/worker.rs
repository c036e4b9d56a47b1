//! Background worker for scheduled and manual cycles

use crate::{CycleReport, CycleRunner, EngineError, EngineMetrics};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use trustlens_domain::traits::SnapshotStore;
use trustlens_domain::CycleTrigger;

type TriggerRequest = oneshot::Sender<CycleReport>;

/// Manual triggers waiting for the worker
const TRIGGER_QUEUE: usize = 16;

/// Control side of a [`CycleWorker`]
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    triggers: mpsc::Sender<TriggerRequest>,
    shutdown: CancellationToken,
}

impl WorkerHandle {
    /// Request a manual cycle and wait for its report
    ///
    /// Queued behind any cycle already running.
    pub async fn trigger(&self) -> Result<CycleReport, EngineError> {
        let (reply, report) = oneshot::channel();
        self.triggers
            .send(reply)
            .await
            .map_err(|_| EngineError::Worker("worker has stopped".to_string()))?;
        report
            .await
            .map_err(|_| EngineError::Worker("worker stopped before the cycle ran".to_string()))
    }

    /// Stop the worker, aborting the cycle in flight
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Runs cycles on a fixed interval and on demand
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use trustlens_engine::{build_runner, CycleWorker, EngineConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = EngineConfig::from_file("trustlens.toml")?;
///     let runner = Arc::new(build_runner(&config)?);
///     let (worker, _handle) = CycleWorker::new(runner, config.engine.cycle_interval());
///
///     // Run until Ctrl+C
///     let metrics = worker.run().await;
///     println!("{}", metrics.summary());
///     Ok(())
/// }
/// ```
pub struct CycleWorker<S>
where
    S: SnapshotStore,
{
    runner: Arc<CycleRunner<S>>,
    interval: Duration,
    triggers: mpsc::Receiver<TriggerRequest>,
    shutdown: CancellationToken,
}

impl<S> CycleWorker<S>
where
    S: SnapshotStore,
    S::Error: Display,
{
    /// Create a worker and the handle that controls it
    pub fn new(runner: Arc<CycleRunner<S>>, interval: Duration) -> (Self, WorkerHandle) {
        let (tx, rx) = mpsc::channel(TRIGGER_QUEUE);
        let shutdown = CancellationToken::new();
        let worker = Self {
            runner,
            interval,
            triggers: rx,
            shutdown: shutdown.clone(),
        };
        let handle = WorkerHandle {
            triggers: tx,
            shutdown,
        };
        (worker, handle)
    }

    /// Run until [`WorkerHandle::shutdown`] or Ctrl+C
    ///
    /// The first scheduled cycle starts immediately. Returns the metrics
    /// accumulated by the runner.
    pub async fn run(mut self) -> EngineMetrics {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ctrl_c = {
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutdown signal received, stopping cycle worker");
                    shutdown.cancel();
                }
            })
        };

        tracing::info!("Cycle worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(reply) = self.triggers.recv() => {
                    let report = self.runner.run_cycle(CycleTrigger::Manual, &self.shutdown).await;
                    if reply.send(report).is_err() {
                        tracing::debug!("Manual trigger caller went away before its report");
                    }
                }
                _ = ticker.tick() => {
                    self.runner.run_cycle(CycleTrigger::Scheduled, &self.shutdown).await;
                }
            }
        }

        ctrl_c.abort();
        let metrics = self.runner.metrics();
        tracing::info!("Cycle worker stopped. Final metrics:\n{}", metrics.summary());
        metrics
    }

    /// Run a fixed number of scheduled cycles (useful for testing)
    pub async fn run_cycles(&mut self, cycles: usize) -> Vec<CycleReport> {
        let mut ticker = interval(self.interval);
        let mut reports = Vec::with_capacity(cycles);

        tracing::info!(
            "Cycle worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting cycle {}/{}", cycle + 1, cycles);

            let report = self
                .runner
                .run_cycle(CycleTrigger::Scheduled, &self.shutdown)
                .await;
            let cancelled = report.cancelled;
            reports.push(report);
            if cancelled {
                break;
            }
        }

        tracing::info!(
            "Cycle worker finished {} cycles. Final metrics:\n{}",
            reports.len(),
            self.runner.metrics().summary()
        );
        reports
    }

    /// Metrics accumulated by the runner
    pub fn metrics(&self) -> EngineMetrics {
        self.runner.metrics()
    }
}
