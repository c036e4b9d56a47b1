//! TrustLens - command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use trustlens_domain::{CycleTrigger, EntityId};
use trustlens_engine::{
    build_runner, format_history, format_report, format_score, open_rollup, Cli, Command,
    CycleWorker, EngineConfig,
};
use trustlens_rollup::QueryError;

#[tokio::main]
async fn main() {
    // Log to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Run => {
            let runner = Arc::new(build_runner(&config)?);
            let (worker, _handle) = CycleWorker::new(runner, config.engine.cycle_interval());
            let metrics = worker.run().await;
            println!("{}", metrics.summary());
        }
        Command::Once => {
            let runner = build_runner(&config)?;
            let cancel = CancellationToken::new();
            let watcher = {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                })
            };
            let report = runner.run_cycle(CycleTrigger::Manual, &cancel).await;
            watcher.abort();
            println!("{}", format_report(&report));
        }
        Command::Latest { entity, json } => {
            let rollup = open_rollup(&config)?;
            match rollup.latest_score(&EntityId::new(entity)) {
                Ok(score) if json => println!("{}", serde_json::to_string_pretty(&score)?),
                Ok(score) => println!("{}", format_score(&score)),
                Err(QueryError::NotYetAnalyzed(id)) => println!("{} has not been analyzed yet", id),
                Err(e) => return Err(e.into()),
            }
        }
        Command::History {
            entity,
            limit,
            json,
        } => {
            let rollup = open_rollup(&config)?;
            match rollup.history(&EntityId::new(entity), limit) {
                Ok(snapshots) if json => {
                    println!("{}", serde_json::to_string_pretty(&snapshots)?)
                }
                Ok(snapshots) => println!("{}", format_history(&snapshots)),
                Err(QueryError::NotYetAnalyzed(id)) => println!("{} has not been analyzed yet", id),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
