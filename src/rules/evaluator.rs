//! Executes a [`CompiledRule`] against the current store for one graph
//! node. The resolver's VM/KB double-indirection (spec: "the store is
//! first indexed by the hosting instance, then by the subservice path")
//! is resolved upstream by the metric updater, which always normalizes a
//! node's observed metrics into that node's own flat sub-tree before the
//! evaluator runs — so `access` here only ever needs one base path.

use crate::catalog::metrics::MetricCatalog;
use crate::core::error::{AgentError, Result};
use crate::rules::ast::{CmpOp, Expr, Literal, WindowKind};
use crate::rules::compiler::CompiledRule;
use crate::rules::value::{IndexedVariable, Value};
use crate::store::metric_store::MetricStore;
use crate::store::ring_buffer::RingBuffer;

/// Per-evaluation context: where in the store this node's normalized
/// metrics live, and the tick period's samples-per-minute derivation
/// used by the `1min`/`5min` window modifiers.
pub struct EvalContext {
    pub base_path: Vec<String>,
    pub samples_per_minute: usize,
}

/// Outcome of evaluating one rule against one node for one tick.
#[derive(Debug, Default)]
pub struct EvalOutcome {
    pub positive: bool,
    /// Index keys of the matched entries, for list-valued positives;
    /// empty for a scalar/non-list positive.
    pub matched_indices: Vec<String>,
}

impl CompiledRule {
    pub fn evaluate(&self, metrics: &MetricCatalog, store: &MetricStore, ctx: &EvalContext) -> Result<EvalOutcome> {
        let value = eval(&self.expr, metrics, store, ctx)?;
        Ok(match value {
            Value::Indexed(iv) if !iv.is_empty() => EvalOutcome {
                positive: true,
                matched_indices: iv.entries.into_iter().filter_map(|e| e.index).collect(),
            },
            Value::Indexed(_) => EvalOutcome::default(),
            other => EvalOutcome {
                positive: other.truthy(),
                matched_indices: Vec::new(),
            },
        })
    }
}

fn eval(expr: &Expr, metrics: &MetricCatalog, store: &MetricStore, ctx: &EvalContext) -> Result<Value> {
    Ok(match expr {
        Expr::Literal(Literal::Num(n)) => Value::Num(*n),
        Expr::Literal(Literal::Str(s)) => Value::Str(s.clone()),
        Expr::Literal(Literal::Bool(b)) => Value::Bool(*b),
        Expr::Ident(name) => access(name, metrics, store, ctx)?,
        Expr::WindowMod(kind, inner) => {
            apply_window(*kind, eval(inner, metrics, store, ctx)?, ctx.samples_per_minute)
        }
        Expr::Not(inner) => eval(inner, metrics, store, ctx)?.not(),
        Expr::Compare(lhs, op, rhs) => {
            let lv = eval(lhs, metrics, store, ctx)?;
            let rv = eval(rhs, metrics, store, ctx)?;
            compare(lv, *op, rv)
        }
        Expr::BoolOp(lhs, op, rhs) => {
            let lv = eval(lhs, metrics, store, ctx)?;
            let rv = eval(rhs, metrics, store, ctx)?;
            lv.combine(*op, rv)
        }
        Expr::Arith(lhs, op, rhs) => {
            let lv = eval(lhs, metrics, store, ctx)?;
            let rv = eval(rhs, metrics, store, ctx)?;
            lv.arith(*op, rv)
        }
    })
}

fn access(name: &str, metrics: &MetricCatalog, store: &MetricStore, ctx: &EvalContext) -> Result<Value> {
    let descriptor = metrics
        .get(name)
        .ok_or_else(|| AgentError::RuleEval(format!("unknown metric '{name}'")))?;

    let mut path: Vec<&str> = ctx.base_path.iter().map(String::as_str).collect();
    path.push(name);

    if descriptor.is_list {
        let keys = store.index_keys(&path);
        let mut entries = Vec::new();
        for key in keys {
            let mut entry_path = path.clone();
            entry_path.push(&key);
            if let Some(rb) = store.get_rb(&entry_path) {
                entries.push((key, rb));
            }
        }
        Ok(Value::Indexed(IndexedVariable::list(entries)))
    } else {
        let rb = store
            .get_rb(&path)
            .unwrap_or_else(|| RingBuffer::new(name, descriptor.kind));
        Ok(Value::Indexed(IndexedVariable::single(rb)))
    }
}

fn apply_window(kind: WindowKind, value: Value, samples_per_minute: usize) -> Value {
    match value {
        Value::Indexed(iv) => Value::Indexed(match kind {
            WindowKind::OneMin => iv.with_count(samples_per_minute.max(1)),
            WindowKind::FiveMin => iv.with_count(samples_per_minute.max(1) * 5),
            WindowKind::Dynamicity => iv.with_dynamicity(),
        }),
        other => other,
    }
}

fn compare(lhs: Value, op: CmpOp, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Indexed(iv), other) => iv.compare(op, other.as_f64()),
        (other, Value::Indexed(iv)) => iv.compare(flip(op), other.as_f64()),
        (lhs, rhs) => Value::Bool(op.apply(lhs.as_f64(), rhs.as_f64())),
    }
}

fn flip(op: CmpOp) -> CmpOp {
    match op {
        CmpOp::Lt => CmpOp::Gt,
        CmpOp::Gt => CmpOp::Lt,
        CmpOp::Le => CmpOp::Ge,
        CmpOp::Ge => CmpOp::Le,
        CmpOp::Eq => CmpOp::Eq,
        CmpOp::Ne => CmpOp::Ne,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::compiler::compile;
    use crate::store::ring_buffer::ScalarKind;
    use std::io::Write;

    fn catalog(rows: &str) -> MetricCatalog {
        let dir = std::env::temp_dir().join(format!("healtheval-{}-{}", std::process::id(), rows.len()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut f = std::fs::File::create(dir.join("metrics.csv")).unwrap();
        f.write_all(rows.as_bytes()).unwrap();
        MetricCatalog::load(&dir).unwrap()
    }

    #[test]
    fn cpu_saturation_scenario_matches() {
        let metrics = catalog("name,subservice,type,unit,is_list,counter\nidle_time,cpus/cpu,float,percent,0,0\n");
        let store = MetricStore::new();
        for _ in 0..20 {
            store.append(
                &["metrics", "cpu0", "idle_time"],
                || RingBuffer::new("idle_time", ScalarKind::Float),
                5.0f64,
            );
        }
        let rule = compile("idle_time < 10 and 1min(idle_time) < 10", &metrics).unwrap();
        let ctx = EvalContext {
            base_path: vec!["metrics".into(), "cpu0".into()],
            samples_per_minute: 20,
        };
        let outcome = rule.evaluate(&metrics, &store, &ctx).unwrap();
        assert!(outcome.positive);
    }

    #[test]
    fn insufficient_samples_does_not_match() {
        let metrics = catalog("name,subservice,type,unit,is_list,counter\nx,cpus/cpu,int,count,0,1\n");
        let store = MetricStore::new();
        for v in [1i64, 2, 3] {
            store.append(&["metrics", "n", "x"], || RingBuffer::new("x", ScalarKind::Int).with_counter(true), v);
        }
        let rule = compile("1min(x) > 0", &metrics).unwrap();
        let ctx = EvalContext { base_path: vec!["metrics".into(), "n".into()], samples_per_minute: 20 };
        let outcome = rule.evaluate(&metrics, &store, &ctx).unwrap();
        assert!(!outcome.positive);
    }

    #[test]
    fn indexed_intersection_scenario() {
        let metrics = catalog(
            "name,subservice,type,unit,is_list,counter\n\
             rx_drop,net/if,int,packets,1,1\n\
             tx_drop,net/if,int,packets,1,1\n",
        );
        let store = MetricStore::new();
        for (iface, rx, tx) in [("eth0", 5i64, 0i64), ("eth1", 5, 5), ("eth2", 0, 5)] {
            store.append(&["metrics", "n", "rx_drop", iface], || RingBuffer::new("rx_drop", ScalarKind::Int).with_counter(true), 0i64);
            store.append(&["metrics", "n", "rx_drop", iface], || RingBuffer::new("rx_drop", ScalarKind::Int).with_counter(true), rx);
            store.append(&["metrics", "n", "tx_drop", iface], || RingBuffer::new("tx_drop", ScalarKind::Int).with_counter(true), 0i64);
            store.append(&["metrics", "n", "tx_drop", iface], || RingBuffer::new("tx_drop", ScalarKind::Int).with_counter(true), tx);
        }
        let rule = compile("rx_drop > 0 and tx_drop > 0", &metrics).unwrap();
        let ctx = EvalContext { base_path: vec!["metrics".into(), "n".into()], samples_per_minute: 20 };
        let outcome = rule.evaluate(&metrics, &store, &ctx).unwrap();
        assert!(outcome.positive);
        assert_eq!(outcome.matched_indices, vec!["eth1".to_string()]);
    }
}
