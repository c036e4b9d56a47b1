//! Assemble a runnable engine from configuration

use crate::sources::register_sources;
use crate::{CycleRunner, EngineConfig, EngineError};
use std::sync::Arc;
use tracing::info;
use trustlens_collector::SignalCollector;
use trustlens_rollup::{EventBus, Rollup};
use trustlens_store::SqliteSnapshotStore;

/// Runner over the SQLite snapshot store
pub type SqliteCycleRunner = CycleRunner<SqliteSnapshotStore>;

/// Open the snapshot store and rehydrate a rollup over it
pub fn open_rollup(config: &EngineConfig) -> Result<Rollup<SqliteSnapshotStore>, EngineError> {
    let store = SqliteSnapshotStore::new(&config.engine.database_path)?;
    let rollup = Rollup::open(store, EventBus::new(config.engine.bus_capacity))?;
    Ok(rollup)
}

/// Build a cycle runner: resolve sources, open storage, validate scoring
pub fn build_runner(config: &EngineConfig) -> Result<SqliteCycleRunner, EngineError> {
    config.validate()?;

    let mut collector = SignalCollector::new(config.collector.clone());
    register_sources(&mut collector, &config.sources)?;

    let rollup = Arc::new(open_rollup(config)?);
    let runner = CycleRunner::new(
        collector,
        &config.scoring,
        rollup,
        config.entities.clone(),
    )?;

    info!(
        "Engine ready: {} sources, {} entities, database {}",
        config.sources.len(),
        config.entities.len(),
        config.engine.database_path.display()
    );
    Ok(runner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceConfig;
    use trustlens_domain::{CycleTrigger, EntityId, SignalType, SourceBinding, TrackedEntity};
    use tokio_util::sync::CancellationToken;

    fn config(dir: &tempfile::TempDir) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.engine.database_path = dir.path().join("trustlens.db");
        config.sources.push(SourceConfig::fallback_only("paid-audit"));
        config.entities.push(
            TrackedEntity::new("casino-a", "Casino A").with_binding(SourceBinding::new(
                "paid-audit",
                vec![SignalType::Complaints],
            )),
        );
        config
    }

    #[test]
    fn test_build_runner() {
        let dir = tempfile::tempdir().unwrap();
        let runner = build_runner(&config(&dir)).unwrap();

        assert_eq!(runner.entities().len(), 1);
        assert_eq!(runner.collector().sources().len(), 1);
        assert_eq!(runner.rollup().analyzed_count(), 0);
        assert!(!runner.is_running());
    }

    #[test]
    fn test_build_runner_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.engine.bus_capacity = 0;

        assert!(matches!(build_runner(&config), Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_fallback_only_entity_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let runner = build_runner(&config(&dir)).unwrap();

        let report = runner
            .run_cycle(CycleTrigger::Manual, &CancellationToken::new())
            .await;

        assert_eq!(report.skipped, vec![EntityId::new("casino-a")]);
        assert!(report.committed.is_empty());
        // Forced fallback is cost control, not degradation
        assert!(report.degraded_sources.is_empty());
        assert_eq!(report.stats.adapter_calls, 0);
    }
}
