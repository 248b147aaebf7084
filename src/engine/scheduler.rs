//! Single fixed-period tick loop driving the engine: collectors have
//! already written to the store by the time a tick starts; the engine
//! itself never performs blocking I/O (spec §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info};

use crate::catalog::{MetricCatalog, RuleCatalog};
use crate::engine::metric_updater::MetricUpdater;
use crate::engine::symptom_evaluator::{EvaluationSummary, SymptomEvaluator};
use crate::graph::tree::DependencyGraph;
use crate::graph::updater::GraphUpdater;
use crate::store::metric_store::MetricStore;

/// Samples-per-minute derivation used by the `1min`/`5min` rule window
/// modifiers: `floor(60 / period_secs)`.
pub fn samples_per_minute(period: Duration) -> usize {
    (60.0 / period.as_secs_f64()).floor().max(1.0) as usize
}

pub struct EngineScheduler {
    period: Duration,
    graph_updater: GraphUpdater,
    metric_updater: MetricUpdater,
    symptom_evaluator: SymptomEvaluator,
    stop: Arc<AtomicBool>,
    tick: u64,
}

impl EngineScheduler {
    pub fn new(
        period: Duration,
        graph_updater: GraphUpdater,
        metric_updater: MetricUpdater,
        symptom_evaluator: SymptomEvaluator,
    ) -> Self {
        Self {
            period,
            graph_updater,
            metric_updater,
            symptom_evaluator,
            stop: Arc::new(AtomicBool::new(false)),
            tick: 0,
        }
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Runs one tick: graph update -> metric update -> symptom
    /// evaluation & propagation.
    pub fn run_once(
        &mut self,
        graph: &mut DependencyGraph,
        store: &MetricStore,
        metrics: &MetricCatalog,
        rules: &RuleCatalog,
    ) -> EvaluationSummary {
        self.tick += 1;
        self.graph_updater.tick(graph, store, metrics, self.tick);
        self.metric_updater.tick(graph, store);
        let summary = self.symptom_evaluator.tick(graph, store, metrics, rules);
        debug!(tick = self.tick, root_score = summary.scores.get(&graph.root.fullname).copied().unwrap_or(0), "tick complete");
        summary
    }

    /// Runs ticks forever at the configured period until `stop_handle()`
    /// is flipped. On shutdown, waits one input period before returning
    /// so in-flight collector writes settle (spec §5).
    pub async fn run(
        &mut self,
        graph: &mut DependencyGraph,
        store: &MetricStore,
        metrics: &MetricCatalog,
        rules: &RuleCatalog,
        mut on_tick: impl FnMut(&EvaluationSummary),
    ) {
        let mut ticker = interval(self.period);
        info!(period_secs = self.period.as_secs_f64(), "engine scheduler starting");
        loop {
            ticker.tick().await;
            if self.stop.load(Ordering::Relaxed) {
                tokio::time::sleep(self.period).await;
                break;
            }
            let summary = self.run_once(graph, store, metrics, rules);
            on_tick(&summary);
        }
        info!("engine scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_minute_derivation() {
        assert_eq!(samples_per_minute(Duration::from_secs(3)), 20);
        assert_eq!(samples_per_minute(Duration::from_secs(1)), 60);
    }
}
