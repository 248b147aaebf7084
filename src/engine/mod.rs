//! The tick pipeline: graph reconciliation, metric normalization,
//! symptom evaluation and score propagation.

pub mod metric_updater;
pub mod scheduler;
pub mod symptom_evaluator;

pub use metric_updater::{HostOs, MetricUpdater};
pub use scheduler::EngineScheduler;
pub use symptom_evaluator::{Aggregator, EvaluationSummary, PositiveSymptom, SymptomEvaluator};
