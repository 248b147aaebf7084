//! External collector interface. The core ships no real procfs,
//! hypervisor or VPP collector — those are out of scope — but defines
//! the trait and bucket names real collectors write into, plus an
//! in-memory test double used by integration tests.

use async_trait::async_trait;

use crate::core::error::Result;
use crate::store::metric_store::MetricStore;

/// Named input buckets collectors write into. Re-exported here as the
/// stable external contract; [`crate::graph::updater::buckets`] consumes
/// the same names from the engine side.
pub mod bucket_names {
    pub use crate::graph::updater::buckets::*;
}

/// A background data source that periodically refreshes the store.
/// Collectors run on their own tasks; the engine tick never calls
/// `collect` itself.
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    async fn collect(&self, store: &MetricStore) -> Result<()>;
}

/// A registry of collectors the daemon starts as independent background
/// tasks at startup.
#[derive(Default)]
pub struct CollectorSet {
    collectors: Vec<Box<dyn Collector>>,
}

impl CollectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Box<dyn Collector>> {
        self.collectors.iter()
    }
}

/// An in-memory collector that replays a fixed set of samples once,
/// useful for integration tests that need to seed the store without a
/// real `/proc` or hypervisor present.
pub struct TestCollector {
    name: String,
    samples: Vec<(Vec<String>, f64)>,
}

impl TestCollector {
    pub fn new(name: impl Into<String>, samples: Vec<(Vec<String>, f64)>) -> Self {
        Self { name: name.into(), samples }
    }
}

#[async_trait]
impl Collector for TestCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, store: &MetricStore) -> Result<()> {
        for (path, value) in &self.samples {
            let refs: Vec<&str> = path.iter().map(String::as_str).collect();
            store.append(
                &refs,
                || crate::store::ring_buffer::RingBuffer::new("test", crate::store::ring_buffer::ScalarKind::Float),
                *value,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collector_writes_samples_into_store() {
        let store = MetricStore::new();
        let collector = TestCollector::new(
            "seed",
            vec![(vec!["stat/cpu".to_string(), "cpu0".to_string(), "idle".to_string()], 5.0)],
        );
        collector.collect(&store).await.unwrap();
        let rb = store.get_rb(&["stat/cpu", "cpu0", "idle"]).unwrap();
        assert_eq!(rb.top().as_f64(), 5.0);
    }
}
