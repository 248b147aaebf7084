//! The tick's authoritative health snapshot: the root's `{fullname ->
//! score}` map and the flat list of positive symptoms, in the shape an
//! external exporter (gNMI server, shared-memory mirror) would publish.

use std::collections::HashMap;

use serde::Serialize;

use crate::engine::symptom_evaluator::{EvaluationSummary, PositiveSymptom as EnginePositiveSymptom};

#[derive(Debug, Serialize)]
pub struct PositiveSymptom {
    pub id: String,
    pub rule_name: String,
    pub node: String,
    pub severity: String,
    pub weight: u32,
    pub args: Vec<String>,
    pub timestamp_secs: Option<u64>,
}

impl From<&EnginePositiveSymptom> for PositiveSymptom {
    fn from(p: &EnginePositiveSymptom) -> Self {
        PositiveSymptom {
            id: p.id.clone(),
            rule_name: p.rule_name.clone(),
            node: p.node_fullname.clone(),
            severity: p.severity.to_string(),
            weight: p.weight,
            args: p.args.clone(),
            timestamp_secs: p.timestamp.and_then(|t| {
                t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok().map(|d| d.as_secs())
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub scores: HashMap<String, u32>,
    pub positive_symptoms: Vec<PositiveSymptom>,
}

impl From<&EvaluationSummary> for HealthSnapshot {
    fn from(summary: &EvaluationSummary) -> Self {
        HealthSnapshot {
            scores: summary.scores.clone(),
            positive_symptoms: summary.positive_symptoms.iter().map(PositiveSymptom::from).collect(),
        }
    }
}

impl HealthSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::symptom_evaluator::EvaluationSummary;

    #[test]
    fn empty_summary_serializes() {
        let summary = EvaluationSummary::default();
        let snapshot = HealthSnapshot::from(&summary);
        assert!(snapshot.to_json().is_ok());
    }
}
