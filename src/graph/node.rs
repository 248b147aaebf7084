//! The dependency graph vertex and the rule instances bound to it.

use std::sync::Arc;
use std::time::SystemTime;

use crate::rules::CompiledRule;
use crate::store::ring_buffer::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Baremetal,
    Vm,
    Kb,
    Generic,
}

/// A catalog rule bound to one graph node: the compiled expression plus
/// this instance's last-evaluation state.
#[derive(Debug, Clone)]
pub struct SymptomInstance {
    pub rule_name: String,
    pub compiled: Arc<CompiledRule>,
    pub severity: Severity,
    pub weight: u32,
    /// Fully-qualified paths of the entities that last matched; empty
    /// for a scalar (non-list) positive.
    pub args: Vec<String>,
    pub last_positive_at: Option<SystemTime>,
}

impl SymptomInstance {
    pub fn new(rule_name: String, compiled: Arc<CompiledRule>, severity: Severity) -> Self {
        Self {
            rule_name,
            compiled,
            severity,
            weight: severity.weight(),
            args: Vec::new(),
            last_positive_at: None,
        }
    }
}

/// One vertex of the subservice dependency graph. Children are owned
/// exclusively by their parent; there is no shared ownership or back-
/// pointer — fullname composition happens top-down during traversal, not
/// via a stored parent reference.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub type_label: String,
    pub instance: Option<String>,
    pub path: String,
    pub fullname: String,
    pub active: bool,
    pub impacting: bool,
    pub children: Vec<Node>,
    pub symptoms: Vec<SymptomInstance>,
    pub health_score: u32,
    pub dependency_graph_changed: u64,
}

impl Node {
    pub fn root(host_name: &str) -> Self {
        Node {
            kind: NodeKind::Root,
            type_label: "node".to_string(),
            instance: Some(host_name.to_string()),
            path: "/node".to_string(),
            fullname: format!("/node[name={host_name}]"),
            active: true,
            impacting: true,
            children: Vec::new(),
            symptoms: Vec::new(),
            health_score: 100,
            dependency_graph_changed: 0,
        }
    }

    pub fn child(
        &self,
        kind: NodeKind,
        type_label: impl Into<String>,
        instance: Option<String>,
        impacting: bool,
    ) -> Node {
        let type_label = type_label.into();
        let path = format!("{}/{}", self.path, type_label);
        let fullname = match &instance {
            Some(name) => format!("{}/{}[name={}]", self.fullname, type_label, name),
            None => format!("{}/{}", self.fullname, type_label),
        };
        Node {
            kind,
            type_label,
            instance,
            path,
            fullname,
            active: true,
            impacting,
            children: Vec::new(),
            symptoms: Vec::new(),
            health_score: 100,
            dependency_graph_changed: 0,
        }
    }

    /// Store path this node's own normalized metrics live under.
    pub fn metric_base(&self) -> Vec<String> {
        vec!["metrics".to_string(), self.fullname.clone()]
    }

    pub fn find_child(&self, type_label: &str, instance: Option<&str>) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| c.type_label == type_label && c.instance.as_deref() == instance)
    }

    pub fn find_child_mut(&mut self, type_label: &str, instance: Option<&str>) -> Option<&mut Node> {
        self.children
            .iter_mut()
            .find(|c| c.type_label == type_label && c.instance.as_deref() == instance)
    }

    /// Depth-first pre-order visit of this node and all descendants.
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a Node>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }

    /// `jsonBag()`: the service-assurance-style export record.
    pub fn json_bag(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.type_label,
            "id": self.fullname,
            "last-change": self.dependency_graph_changed,
            "label": self.instance.clone().unwrap_or_else(|| self.type_label.clone()),
            "health-score": self.health_score,
            "symptoms": self.symptoms.iter().filter(|s| s.last_positive_at.is_some()).map(|s| {
                serde_json::json!({
                    "id": crate::graph::symptom_id(&s.rule_name),
                    "health-score-weight": s.weight,
                    "label": s.rule_name,
                    "start-date-time": s.last_positive_at.and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok()).map(|d| d.as_secs()),
                })
            }).collect::<Vec<_>>(),
            "dependencies": self.children.iter().map(|c| {
                serde_json::json!({
                    "id": c.fullname,
                    "type": if c.impacting { "impacting" } else { "informational" },
                })
            }).collect::<Vec<_>>(),
        })
    }
}
