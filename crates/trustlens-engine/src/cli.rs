//! CLI command definitions and output formatting

use crate::CycleReport;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trustlens_domain::{CompositeScore, Snapshot};

/// TrustLens - explainable trust scores for tracked platforms.
#[derive(Debug, Parser)]
#[command(name = "trustlens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "TRUSTLENS_CONFIG", default_value = "trustlens.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run cycles on the configured interval until Ctrl+C
    Run,

    /// Run one manual cycle and print its report
    Once,

    /// Show the latest committed score for an entity
    Latest {
        /// Entity identifier
        entity: String,

        /// Print the score as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show committed snapshots for an entity, newest first
    History {
        /// Entity identifier
        entity: String,

        /// Maximum snapshots to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Print the snapshots as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Human-readable rendering of a composite score
pub fn format_score(score: &CompositeScore) -> String {
    let mut lines = vec![format!(
        "{}  overall {:.2}  confidence {:.2}{}",
        score.entity_id,
        score.overall,
        score.confidence,
        if score.is_low_confidence() {
            "  [low confidence]"
        } else {
            ""
        }
    )];
    lines.push(format!("  cycle {}", score.cycle_id));

    for category in &score.category_breakdown {
        lines.push(format!(
            "  {:<20} {:>6.2}  (weight {:.2}, confidence {:.2})",
            category.category.as_str(),
            category.score,
            category.weight,
            category.confidence
        ));
    }

    if !score.rationale.is_empty() {
        lines.push("  Biggest deductions:".to_string());
        for entry in &score.rationale {
            lines.push(format!(
                "    - {} ({}): -{:.2} points",
                entry.metric.as_str(),
                entry.category.as_str(),
                entry.magnitude
            ));
        }
    }

    let provenance = &score.provenance_summary;
    lines.push(format!(
        "  Evidence: {} live, {} cached, {} fallback, {} missing",
        provenance.live, provenance.cached, provenance.fallback, provenance.missing
    ));
    if !provenance.degraded_sources.is_empty() {
        let sources: Vec<&str> = provenance
            .degraded_sources
            .iter()
            .map(|s| s.as_str())
            .collect();
        lines.push(format!("  Degraded sources: {}", sources.join(", ")));
    }

    lines.join("\n")
}

/// One line per snapshot: cycle, commit time and headline numbers
pub fn format_history(snapshots: &[Snapshot]) -> String {
    snapshots
        .iter()
        .map(|s| {
            format!(
                "{}  stored {}  overall {:>6.2}  confidence {:.2}",
                s.cycle_id, s.stored_at, s.composite_score.overall, s.composite_score.confidence
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cycle summary followed by per-entity outcomes
pub fn format_report(report: &CycleReport) -> String {
    let mut lines = vec![report.summary()];
    for entity in &report.committed {
        lines.push(format!("  committed  {}", entity));
    }
    for entity in &report.skipped {
        lines.push(format!("  skipped    {}", entity));
    }
    for (entity, error) in &report.failed {
        lines.push(format!("  failed     {}: {}", entity, error));
    }
    for entity in &report.aborted {
        lines.push(format!("  aborted    {}", entity));
    }
    for (source, reason) in &report.degraded_sources {
        lines.push(format!("  degraded   {}: {}", source, reason));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustlens_domain::{
        CategoryScore, CycleId, EntityId, MetricCategory, MetricKind, ProvenanceSummary,
        RationaleEntry, SourceId,
    };

    fn score(low_confidence: bool) -> CompositeScore {
        CompositeScore {
            entity_id: EntityId::new("casino-a"),
            cycle_id: CycleId::from_value(7),
            overall: 81.5,
            category_breakdown: MetricCategory::ALL.map(|category| CategoryScore {
                category,
                score: 80.0,
                confidence: 0.75,
                weight: 0.2,
            }),
            confidence: 0.75,
            rationale: vec![RationaleEntry {
                metric: MetricKind::RtpAccuracy,
                category: MetricCategory::Fairness,
                value: 45.0,
                magnitude: 11.55,
            }],
            provenance_summary: ProvenanceSummary {
                live: 7,
                fallback: 2,
                degraded_sources: vec![SourceId::new("regulator")],
                low_confidence,
                ..Default::default()
            },
            metrics: Vec::new(),
        }
    }

    #[test]
    fn test_cli_parses_history() {
        let cli = Cli::parse_from(["trustlens", "--config", "x.toml", "history", "casino-a", "-l", "3"]);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        match cli.command {
            Command::History { entity, limit, json } => {
                assert_eq!(entity, "casino-a");
                assert_eq!(limit, 3);
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_config_after_subcommand() {
        let cli = Cli::parse_from(["trustlens", "latest", "casino-a", "--json", "-c", "y.toml"]);
        assert_eq!(cli.config, PathBuf::from("y.toml"));
        assert!(matches!(cli.command, Command::Latest { json: true, .. }));
    }

    #[test]
    fn test_format_score() {
        let text = format_score(&score(false));
        assert!(text.starts_with("casino-a  overall 81.50"));
        assert!(text.contains("fairness"));
        assert!(text.contains("bonus_terms"));
        assert!(text.contains("rtp_accuracy (fairness): -11.55 points"));
        assert!(text.contains("7 live, 0 cached, 2 fallback"));
        assert!(text.contains("Degraded sources: regulator"));
        assert!(!text.contains("[low confidence]"));
    }

    #[test]
    fn test_format_score_flags_low_confidence() {
        assert!(format_score(&score(true)).contains("[low confidence]"));
    }
}
