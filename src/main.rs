use anyhow::{Context, Result};
use clap::Parser;

use subservice_agent::catalog::{MetricCatalog, RuleCatalog};
use subservice_agent::collectors::CollectorSet;
use subservice_agent::core::{init_logging, AgentConfig, CommandlineArgs};
use subservice_agent::engine::scheduler::samples_per_minute;
use subservice_agent::engine::{Aggregator, EngineScheduler, HostOs, MetricUpdater};
use subservice_agent::export;
use subservice_agent::graph::{DependencyGraph, GraphUpdater};
use subservice_agent::store::MetricStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CommandlineArgs::parse();
    let mut config = AgentConfig::load(&args.config).context("failed to load agent configuration")?;

    if let Some(dir) = &args.resources_dir {
        config.engine.resources_dir = dir.clone();
    }
    if let Some(period) = args.period {
        config.engine.period_secs = period;
    }
    if let Some(aggregator) = &args.aggregator {
        config.engine.aggregator = aggregator.clone();
    }

    init_logging(Some(&config.logging)).context("failed to initialize logging")?;

    let aggregator = Aggregator::from_name(&config.engine.aggregator)
        .with_context(|| format!("unknown aggregator '{}'", config.engine.aggregator))?;

    let metrics = MetricCatalog::load(&config.engine.resources_dir)
        .with_context(|| format!("failed to load metric catalog from {}", config.engine.resources_dir))?;
    let rules = RuleCatalog::load(&config.engine.resources_dir, &metrics)
        .with_context(|| format!("failed to load rule catalog from {}", config.engine.resources_dir))?;
    tracing::info!(metrics = metrics.names().count(), rules = rules.len(), "catalogs loaded");

    let host_name = host_identity();
    let mut graph = DependencyGraph::new(&host_name);
    let store = MetricStore::new();

    // The core ships no real collectors (out of scope); register the
    // empty set so a real daemon build has somewhere to plug them in.
    let collectors = CollectorSet::new();
    for collector in collectors.iter() {
        tracing::debug!(collector = collector.name(), "collector registered");
    }

    let period = std::time::Duration::from_secs(config.engine.period_secs.max(1));
    let mut scheduler = EngineScheduler::new(
        period,
        GraphUpdater::new(local_kb_supported()),
        MetricUpdater::new(host_os()),
        subservice_agent::engine::SymptomEvaluator::new(aggregator, samples_per_minute(period)),
    );

    if args.once {
        let summary = scheduler.run_once(&mut graph, &store, &metrics, &rules);
        let snapshot = export::HealthSnapshot::from(&summary);
        println!("{}", snapshot.to_json()?);
        return Ok(());
    }

    scheduler
        .run(&mut graph, &store, &metrics, &rules, |summary| {
            tracing::info!(
                positive_symptoms = summary.positive_symptoms.len(),
                nodes = summary.scores.len(),
                "tick published"
            );
        })
        .await;

    Ok(())
}

fn host_identity() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "localhost".to_string())
}

fn host_os() -> HostOs {
    match std::env::consts::OS {
        "linux" => HostOs::Linux,
        "windows" => HostOs::Windows,
        "macos" => HostOs::MacOs,
        _ => HostOs::Linux,
    }
}

/// Whether a local VPP API is reachable on this host. The core never
/// probes for this itself (that would be a collector's job); a real
/// daemon build would pass this in from its VPP collector's startup
/// probe. Conservatively `false` here since this binary ships none.
fn local_kb_supported() -> bool {
    false
}
