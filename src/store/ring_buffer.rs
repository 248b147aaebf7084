//! Fixed-capacity time series of a typed scalar, with dynamicity and
//! severity semantics.

use std::collections::VecDeque;
use std::fmt;

/// Severity indicator, with a fixed numeric weight used as a health-score
/// penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Green,
    Orange,
    Red,
}

impl Severity {
    /// Health-score penalty associated with this severity.
    pub fn weight(self) -> u32 {
        match self {
            Severity::Green => 0,
            Severity::Orange => 10,
            Severity::Red => 50,
        }
    }

    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GREEN" => Some(Severity::Green),
            "ORANGE" => Some(Severity::Orange),
            "RED" => Some(Severity::Red),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Green => write!(f, "green"),
            Severity::Orange => write!(f, "orange"),
            Severity::Red => write!(f, "red"),
        }
    }
}

/// Declared scalar kind of a ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int,
    Float,
    String,
}

/// A single scalar sample, cast to the ring buffer's declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn as_f64(&self) -> f64 {
        match self {
            Scalar::Int(v) => *v as f64,
            Scalar::Float(v) => *v,
            Scalar::Str(s) => s.parse().unwrap_or(0.0),
        }
    }

    pub fn as_str(&self) -> String {
        match self {
            Scalar::Int(v) => v.to_string(),
            Scalar::Float(v) => v.to_string(),
            Scalar::Str(s) => s.clone(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Scalar::Int(v) => *v != 0,
            Scalar::Float(v) => *v != 0.0,
            Scalar::Str(s) => s == "true" || s == "1",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Anything that can be pushed into a RingBuffer.
pub trait IntoScalar {
    fn into_scalar(self, kind: ScalarKind) -> Scalar;
}

impl IntoScalar for i64 {
    fn into_scalar(self, kind: ScalarKind) -> Scalar {
        match kind {
            ScalarKind::Int => Scalar::Int(self),
            ScalarKind::Float => Scalar::Float(self as f64),
            ScalarKind::String => Scalar::Str(self.to_string()),
        }
    }
}

impl IntoScalar for f64 {
    fn into_scalar(self, kind: ScalarKind) -> Scalar {
        match kind {
            ScalarKind::Int => Scalar::Int(self as i64),
            ScalarKind::Float => Scalar::Float(self),
            ScalarKind::String => Scalar::Str(self.to_string()),
        }
    }
}

impl IntoScalar for &str {
    fn into_scalar(self, kind: ScalarKind) -> Scalar {
        match kind {
            ScalarKind::Int => Scalar::Int(self.parse().unwrap_or(0)),
            ScalarKind::Float => Scalar::Float(self.parse().unwrap_or(0.0)),
            ScalarKind::String => Scalar::Str(self.to_string()),
        }
    }
}

impl IntoScalar for bool {
    fn into_scalar(self, kind: ScalarKind) -> Scalar {
        match kind {
            ScalarKind::Int => Scalar::Int(self as i64),
            ScalarKind::Float => Scalar::Float(self as i64 as f64),
            ScalarKind::String => Scalar::Str(self.to_string()),
        }
    }
}

const DEFAULT_CAPACITY: usize = 60;

/// Bounded FIFO of scalar samples of one declared kind.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    name: String,
    unit: String,
    kind: ScalarKind,
    counter: bool,
    metric: bool,
    capacity: usize,
    samples: VecDeque<Scalar>,
}

impl RingBuffer {
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::with_capacity(name, kind, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(name: impl Into<String>, kind: ScalarKind, capacity: usize) -> Self {
        Self {
            name: name.into(),
            unit: String::new(),
            kind,
            counter: false,
            metric: false,
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_counter(mut self, counter: bool) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_metric(mut self, metric: bool) -> Self {
        self.metric = metric;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn unit(&self) -> &str {
        &self.unit
    }
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }
    pub fn is_counter(&self) -> bool {
        self.counter
    }
    pub fn is_metric(&self) -> bool {
        self.metric
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample, casting it to the declared kind. Evicts the
    /// oldest sample when at capacity.
    pub fn append(&mut self, value: impl IntoScalar) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value.into_scalar(self.kind));
    }

    fn zero(&self) -> Scalar {
        match self.kind {
            ScalarKind::Int => Scalar::Int(0),
            ScalarKind::Float => Scalar::Float(0.0),
            ScalarKind::String => Scalar::Str(String::new()),
        }
    }

    /// Last value, or the kind's zero if empty.
    pub fn top(&self) -> Scalar {
        self.samples.back().cloned().unwrap_or_else(|| self.zero())
    }

    /// Last `k` values, oldest to newest. Empty if fewer than `k` samples
    /// exist.
    pub fn tops(&self, k: usize) -> Vec<Scalar> {
        if k == 0 || self.samples.len() < k {
            return Vec::new();
        }
        self.samples.iter().skip(self.samples.len() - k).cloned().collect()
    }

    pub fn min(&self) -> Option<Scalar> {
        self.samples
            .iter()
            .cloned()
            .reduce(|a, b| if b.as_f64() < a.as_f64() { b } else { a })
    }

    pub fn max(&self) -> Option<Scalar> {
        self.samples
            .iter()
            .cloned()
            .reduce(|a, b| if b.as_f64() > a.as_f64() { b } else { a })
    }

    /// Mean over the last `count` samples (0 = entire buffer). Non-numeric
    /// kinds always report 0.
    pub fn mean(&self, count: usize) -> f64 {
        if self.samples.is_empty() || self.kind == ScalarKind::String {
            return 0.0;
        }
        let count = if count == 0 { self.samples.len() } else { count };
        let slice = self.tops(count.min(self.samples.len()));
        if slice.is_empty() {
            return 0.0;
        }
        let sum: f64 = slice.iter().map(Scalar::as_f64).sum();
        sum / slice.len() as f64
    }

    /// `delta(k) = last - element at index max(-k-1, -size)`. `None` when
    /// there are no samples at all (the "insufficient samples" signal).
    pub fn delta(&self, count: usize) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        if count > 0 && self.samples.len() <= count {
            return None;
        }
        let len = self.samples.len() as isize;
        let first_index = if count == 0 {
            0
        } else {
            (len - 1 - count as isize).max(0)
        };
        let last = self.samples.back()?.as_f64();
        let first = self.samples.get(first_index as usize)?.as_f64();
        Some(last - first)
    }

    /// True iff the last `k` values are not all equal. `None` if fewer
    /// than `k` samples exist.
    pub fn has_changed(&self, count: usize) -> Option<bool> {
        let count = if count == 0 { self.samples.len() } else { count };
        if self.samples.is_empty() || self.samples.len() < count {
            return None;
        }
        let tops = self.tops(count);
        let first = &tops[0];
        Some(tops.iter().any(|v| v != first))
    }

    /// Delta for counters, has-changed for strings, mean otherwise.
    /// `None` propagates "insufficient samples" for counters/strings.
    pub fn dynamicity(&self, count: usize) -> Option<f64> {
        match self.kind {
            ScalarKind::String => self.has_changed(count).map(|b| b as i64 as f64),
            _ if self.counter => self.delta(count),
            _ => Some(self.mean(count)),
        }
    }

    /// Severity escalation for the raw top value: orange above 3x mean,
    /// red above 10x mean. Gauges only (counters and strings stay green).
    pub fn top_severity(&self) -> Severity {
        if self.counter || self.kind == ScalarKind::String || self.samples.is_empty() {
            return Severity::Green;
        }
        let mean = self.mean(0);
        let top = self.top().as_f64();
        if mean != 0.0 && top > mean * 10.0 {
            Severity::Red
        } else if mean != 0.0 && top > mean * 3.0 {
            Severity::Orange
        } else {
            Severity::Green
        }
    }

    /// Severity for dynamicity: orange when a string changed, green
    /// otherwise.
    pub fn dynamicity_severity(&self) -> Severity {
        if self.kind == ScalarKind::String && self.has_changed(0).unwrap_or(false) {
            Severity::Orange
        } else {
            Severity::Green
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_evicts_oldest_when_full() {
        let mut rb = RingBuffer::with_capacity("x", ScalarKind::Int, 3);
        rb.append(1i64);
        rb.append(2i64);
        rb.append(3i64);
        rb.append(4i64);
        assert_eq!(rb.len(), 3);
        assert_eq!(rb.tops(3), vec![Scalar::Int(2), Scalar::Int(3), Scalar::Int(4)]);
    }

    #[test]
    fn empty_rb_returns_kind_zero() {
        let rb = RingBuffer::new("x", ScalarKind::String);
        assert_eq!(rb.top(), Scalar::Str(String::new()));
        let rb = RingBuffer::new("y", ScalarKind::Int);
        assert_eq!(rb.top(), Scalar::Int(0));
    }

    #[test]
    fn counter_delta_over_window() {
        let mut rb = RingBuffer::new("rx_drop", ScalarKind::Int).with_counter(true);
        for v in [100i64, 100, 105, 110] {
            rb.append(v);
        }
        assert_eq!(rb.dynamicity(3), Some(10.0));
    }

    #[test]
    fn insufficient_samples_reports_none() {
        let mut rb = RingBuffer::new("x", ScalarKind::Int).with_counter(true);
        rb.append(1i64);
        rb.append(2i64);
        rb.append(3i64);
        // asking for a 20-sample window with only 3 samples: has_changed
        // correctly signals insufficiency.
        assert_eq!(rb.has_changed(20), None);
    }

    #[test]
    fn has_changed_detects_string_flap() {
        let mut rb = RingBuffer::new("state", ScalarKind::String);
        for v in ["up", "up", "down"] {
            rb.append(v);
        }
        assert_eq!(rb.has_changed(3), Some(true));
        assert_eq!(rb.dynamicity_severity(), Severity::Orange);
    }

    #[test]
    fn top_severity_escalates_for_gauge_spikes() {
        let mut rb = RingBuffer::new("temp", ScalarKind::Float);
        for v in [10.0, 10.0, 10.0, 10.0, 120.0] {
            rb.append(v);
        }
        assert_eq!(rb.top_severity(), Severity::Red);
    }
}
