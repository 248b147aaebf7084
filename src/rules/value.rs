//! The indexed-variable algebra: the value space rule expressions
//! evaluate into. Scalars behave like ordinary numbers/strings/bools;
//! [`IndexedVariable`] wraps one RB or a keyed collection of them and
//! carries the window-modifier context (`count`, `dynamicity`) that
//! comparisons and arithmetic consult.

use std::collections::BTreeSet;

use crate::rules::ast::{ArithOp, CmpOp};
use crate::store::ring_buffer::RingBuffer;

/// One entry of an indexed variable: `index = None` for the non-list
/// case (a single RB with no entity dimension).
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub index: Option<String>,
    pub rb: RingBuffer,
}

#[derive(Debug, Clone)]
pub struct IndexedVariable {
    pub entries: Vec<IndexedEntry>,
    pub is_list: bool,
    /// Samples considered by downstream comparisons; 0 means "default"
    /// (most recent sample only).
    pub count: usize,
    /// When set, comparisons consult `rb.dynamicity(count)` instead of
    /// raw sample values.
    pub dynamicity: bool,
}

impl IndexedVariable {
    pub fn single(rb: RingBuffer) -> Self {
        Self {
            entries: vec![IndexedEntry { index: None, rb }],
            is_list: false,
            count: 0,
            dynamicity: false,
        }
    }

    pub fn list(entries: Vec<(String, RingBuffer)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, rb)| IndexedEntry { index: Some(k), rb })
                .collect(),
            is_list: true,
            count: 0,
            dynamicity: false,
        }
    }

    fn window(&self) -> usize {
        if self.count == 0 {
            1
        } else {
            self.count
        }
    }

    fn index_keys(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter_map(|e| e.index.clone())
            .collect()
    }

    /// Apply a window modifier, returning a variable with updated
    /// evaluation context. `1min`/`5min` set `count`; `dynamicity` sets
    /// the flag.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_dynamicity(mut self) -> Self {
        self.dynamicity = true;
        self
    }

    /// `x op c`: per spec §4.5, matches each entry independently against
    /// `c`, returning the subset that matched (or a scalar bool for
    /// non-list / no-match cases).
    pub fn compare(&self, op: CmpOp, rhs: f64) -> Value {
        let window = self.window();
        let matched: Vec<IndexedEntry> = self
            .entries
            .iter()
            .filter(|e| {
                if self.dynamicity {
                    e.rb.dynamicity(window).is_some_and(|v| op.apply(v, rhs))
                } else {
                    let samples = e.rb.tops(window);
                    !samples.is_empty() && samples.iter().all(|s| op.apply(s.as_f64(), rhs))
                }
            })
            .cloned()
            .collect();

        if !self.is_list {
            return Value::Bool(!matched.is_empty());
        }
        if matched.is_empty() {
            Value::Bool(false)
        } else {
            Value::Indexed(IndexedVariable {
                entries: matched,
                is_list: true,
                count: self.count,
                dynamicity: self.dynamicity,
            })
        }
    }

    /// Representative numeric value for arithmetic: the dynamicity
    /// summary when the dynamicity flag is set, else the latest sample.
    fn representative(&self, entry: &IndexedEntry) -> f64 {
        if self.dynamicity {
            entry.rb.dynamicity(self.window()).unwrap_or(0.0)
        } else {
            entry.rb.top().as_f64()
        }
    }

    fn arith(&self, op: ArithOp, rhs: &IndexedVariable) -> IndexedVariable {
        let mut entries = Vec::new();
        for l in &self.entries {
            let Some(r) = rhs.entries.iter().find(|r| r.index == l.index) else {
                continue;
            };
            let a = self.representative(l);
            let b = rhs.representative(r);
            let v = apply_arith(op, a, b);
            entries.push(IndexedEntry {
                index: l.index.clone(),
                rb: synthetic_rb(v),
            });
        }
        IndexedVariable {
            entries,
            is_list: self.is_list || rhs.is_list,
            count: self.count,
            dynamicity: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn synthetic_rb(v: f64) -> RingBuffer {
    let mut rb = RingBuffer::with_capacity("_arith", crate::store::ring_buffer::ScalarKind::Float, 1);
    rb.append(v);
    rb
}

fn apply_arith(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                0.0
            } else {
                a / b
            }
        }
        ArithOp::FloorDiv => {
            if b == 0.0 {
                0.0
            } else {
                (a / b).floor()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Num(f64),
    Str(String),
    Indexed(IndexedVariable),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Indexed(iv) => !iv.is_empty(),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Bool(b) => *b as i64 as f64,
            Value::Num(n) => *n,
            Value::Str(s) => s.parse().unwrap_or(0.0),
            Value::Indexed(iv) => iv.entries.first().map(|e| e.rb.top().as_f64()).unwrap_or(0.0),
        }
    }

    /// `&` / `|` lowered from `and`/`or`: index-set intersection/union
    /// when both sides are list-valued indexed variables, plain boolean
    /// logic otherwise.
    pub fn combine(self, op: crate::rules::ast::BoolOp, rhs: Value) -> Value {
        use crate::rules::ast::BoolOp;
        if let (Value::Indexed(a), Value::Indexed(b)) = (&self, &rhs) {
            if a.is_list && b.is_list {
                let result = match op {
                    BoolOp::And => set_intersect(a, b),
                    BoolOp::Or => set_union(a, b),
                };
                return if result.is_empty() {
                    Value::Bool(false)
                } else {
                    Value::Indexed(result)
                };
            }
        }
        let (a, b) = (self.truthy(), rhs.truthy());
        Value::Bool(match op {
            BoolOp::And => a && b,
            BoolOp::Or => a || b,
        })
    }

    pub fn arith(self, op: ArithOp, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Indexed(a), Value::Indexed(b)) => Value::Indexed(a.arith(op, &b)),
            (a, b) => Value::Num(apply_arith(op, a.as_f64(), b.as_f64())),
        }
    }

    pub fn not(self) -> Value {
        Value::Bool(!self.truthy())
    }
}

fn set_intersect(a: &IndexedVariable, b: &IndexedVariable) -> IndexedVariable {
    let b_keys = b.index_keys();
    let entries = a
        .entries
        .iter()
        .filter(|e| e.index.as_ref().is_some_and(|k| b_keys.contains(k)))
        .cloned()
        .collect();
    IndexedVariable { entries, is_list: true, count: a.count, dynamicity: a.dynamicity }
}

fn set_union(a: &IndexedVariable, b: &IndexedVariable) -> IndexedVariable {
    let mut seen = BTreeSet::new();
    let mut entries = Vec::new();
    for e in a.entries.iter().chain(b.entries.iter()) {
        if let Some(k) = &e.index {
            if seen.insert(k.clone()) {
                entries.push(e.clone());
            }
        }
    }
    IndexedVariable { entries, is_list: true, count: a.count, dynamicity: a.dynamicity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ring_buffer::ScalarKind;

    fn rb_with(values: &[f64]) -> RingBuffer {
        let mut rb = RingBuffer::new("x", ScalarKind::Float);
        for v in values {
            rb.append(*v);
        }
        rb
    }

    #[test]
    fn index_intersection_keeps_common_keys_only() {
        let a = IndexedVariable::list(vec![
            ("eth0".into(), rb_with(&[1.0])),
            ("eth1".into(), rb_with(&[1.0])),
        ]);
        let b = IndexedVariable::list(vec![
            ("eth1".into(), rb_with(&[1.0])),
            ("eth2".into(), rb_with(&[1.0])),
        ]);
        let result = set_intersect(&a, &b);
        let keys: Vec<_> = result.entries.iter().filter_map(|e| e.index.clone()).collect();
        assert_eq!(keys, vec!["eth1".to_string()]);
    }

    #[test]
    fn comparison_on_nonlist_variable_yields_scalar_bool() {
        let v = IndexedVariable::single(rb_with(&[5.0]));
        assert!(matches!(v.compare(CmpOp::Lt, 10.0), Value::Bool(true)));
    }

    #[test]
    fn division_by_zero_yields_zero() {
        assert_eq!(apply_arith(ArithOp::Div, 5.0, 0.0), 0.0);
    }
}
