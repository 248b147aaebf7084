//! Bottom-up symptom evaluation and health-score propagation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::warn;

use crate::catalog::rules::RuleCatalog;
use crate::graph::node::{Node, SymptomInstance};
use crate::graph::tree::DependencyGraph;
use crate::graph::symptom_id;
use crate::rules::evaluator::EvalContext;
use crate::store::metric_store::MetricStore;
use crate::store::ring_buffer::Severity;

/// Selectable dependency-score aggregator (spec §4.8). Quadratic mean is
/// the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    QuadraticMean,
    ArithmeticMean,
    GeometricMean,
    HarmonicMean,
    Malus,
}

impl Aggregator {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "quadratic" | "quadratic-mean" => Some(Aggregator::QuadraticMean),
            "arithmetic" | "arithmetic-mean" => Some(Aggregator::ArithmeticMean),
            "geometric" | "geometric-mean" => Some(Aggregator::GeometricMean),
            "harmonic" | "harmonic-mean" => Some(Aggregator::HarmonicMean),
            "malus" => Some(Aggregator::Malus),
            _ => None,
        }
    }

    pub fn aggregate(self, scores: &[u32]) -> u32 {
        if scores.is_empty() {
            return 100;
        }
        let n = scores.len() as f64;
        let result = match self {
            Aggregator::QuadraticMean => {
                let ms = scores.iter().map(|s| (*s as f64).powi(2)).sum::<f64>() / n;
                ms.sqrt()
            }
            Aggregator::ArithmeticMean => scores.iter().map(|s| *s as f64).sum::<f64>() / n,
            Aggregator::GeometricMean => {
                let product: f64 = scores.iter().map(|s| *s as f64).product();
                product.powf(1.0 / n)
            }
            Aggregator::HarmonicMean => {
                if scores.iter().any(|s| *s == 0) {
                    0.0
                } else {
                    n / scores.iter().map(|s| 1.0 / *s as f64).sum::<f64>()
                }
            }
            Aggregator::Malus => {
                let penalty: f64 = scores.iter().map(|s| 100.0 - *s as f64).sum();
                100.0 - penalty
            }
        };
        result.round().clamp(0.0, 100.0) as u32
    }
}

#[derive(Debug, Clone)]
pub struct PositiveSymptom {
    pub id: String,
    pub rule_name: String,
    pub node_fullname: String,
    pub severity: Severity,
    pub weight: u32,
    pub args: Vec<String>,
    pub timestamp: Option<SystemTime>,
}

#[derive(Debug, Default)]
pub struct EvaluationSummary {
    pub positive_symptoms: Vec<PositiveSymptom>,
    pub scores: HashMap<String, u32>,
}

pub struct SymptomEvaluator {
    pub aggregator: Aggregator,
    pub samples_per_minute: usize,
}

impl SymptomEvaluator {
    pub fn new(aggregator: Aggregator, samples_per_minute: usize) -> Self {
        Self { aggregator, samples_per_minute }
    }

    pub fn tick(
        &self,
        graph: &mut DependencyGraph,
        store: &MetricStore,
        metrics: &crate::catalog::metrics::MetricCatalog,
        rules: &RuleCatalog,
    ) -> EvaluationSummary {
        let mut summary = EvaluationSummary::default();
        self.recurse(&mut graph.root, store, metrics, rules, &mut summary);
        summary
    }

    fn recurse(
        &self,
        node: &mut Node,
        store: &MetricStore,
        metrics: &crate::catalog::metrics::MetricCatalog,
        rules: &RuleCatalog,
        summary: &mut EvaluationSummary,
    ) -> u32 {
        if node.symptoms.is_empty() {
            for descriptor in rules.for_path(&node.path) {
                node.symptoms.push(SymptomInstance::new(
                    descriptor.name.clone(),
                    Arc::new(descriptor.compiled.clone()),
                    descriptor.severity,
                ));
            }
        }

        let mut dep_scores = Vec::new();
        for child in node.children.iter_mut() {
            let child_score = self.recurse(child, store, metrics, rules, summary);
            if child.active && child.impacting {
                dep_scores.push(child_score);
            }
        }

        if !node.active {
            return node.health_score;
        }

        let mut score = self.aggregator.aggregate(&dep_scores);

        let base_path = node.metric_base();
        for symptom in node.symptoms.iter_mut() {
            let ctx = EvalContext {
                base_path: base_path.clone(),
                samples_per_minute: self.samples_per_minute,
            };
            match symptom.compiled.evaluate(metrics, store, &ctx) {
                Ok(outcome) if outcome.positive => {
                    symptom.last_positive_at = Some(SystemTime::now());
                    symptom.args = if outcome.matched_indices.is_empty() {
                        vec![node.fullname.clone()]
                    } else {
                        outcome
                            .matched_indices
                            .iter()
                            .map(|idx| format!("{}[name={idx}]", node.fullname))
                            .collect()
                    };
                    score = score.saturating_sub(symptom.weight).min(100);
                    summary.positive_symptoms.push(PositiveSymptom {
                        id: symptom_id(&symptom.rule_name),
                        rule_name: symptom.rule_name.clone(),
                        node_fullname: node.fullname.clone(),
                        severity: symptom.severity,
                        weight: symptom.weight,
                        args: symptom.args.clone(),
                        timestamp: symptom.last_positive_at,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(rule = %symptom.rule_name, node = %node.fullname, error = %e, "rule evaluation failed");
                }
            }
        }

        score = score.clamp(0, 100);
        node.health_score = score;
        summary.scores.insert(node.fullname.clone(), score);
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_mean_matches_scenario() {
        let agg = Aggregator::QuadraticMean;
        assert_eq!(agg.aggregate(&[100, 100, 50]), 87);
    }

    #[test]
    fn empty_dependency_list_yields_full_score() {
        assert_eq!(Aggregator::QuadraticMean.aggregate(&[]), 100);
    }

    #[test]
    fn malus_aggregator_sums_penalties() {
        assert_eq!(Aggregator::Malus.aggregate(&[50, 100]), 50);
    }
}
