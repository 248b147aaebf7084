//! Nested metric store: collector-written input buckets and the
//! engine-normalized per-subservice metric maps share the same structure.
//!
//! Every bucket (sub-mapping) is a `DashMap` behind an `Arc`, so walking
//! down a path is a sequence of short-lived `get`s that each clone the
//! child's handle and drop the parent's guard immediately — this sidesteps
//! holding multiple dashmap guards alive across a traversal while still
//! giving background collectors a true concurrent-safe sub-map per spec.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::store::ring_buffer::RingBuffer;

/// A node of the recursively nested store: either a further sub-mapping
/// or a ring buffer leaf.
#[derive(Debug, Clone)]
enum StoreNode {
    Bucket(Arc<DashMap<String, StoreNode>>),
    Leaf(Arc<RwLock<RingBuffer>>),
}

fn new_bucket() -> StoreNode {
    StoreNode::Bucket(Arc::new(DashMap::new()))
}

fn get_child(map: &DashMap<String, StoreNode>, key: &str) -> Option<StoreNode> {
    map.get(key).map(|r| r.value().clone())
}

fn get_or_insert_bucket(map: &DashMap<String, StoreNode>, key: &str) -> Arc<DashMap<String, StoreNode>> {
    let entry = map.entry(key.to_string()).or_insert_with(new_bucket);
    match entry.value() {
        StoreNode::Bucket(b) => b.clone(),
        StoreNode::Leaf(_) => panic!("store path collides with an existing leaf at '{key}'"),
    }
}

/// The metric store: a concurrent-safe, recursively nested mapping from
/// string keys to either sub-mappings or ring buffers.
///
/// Every top-level key is a "bucket": either a raw collector input (e.g.
/// `net/dev`) or an engine-normalized per-path metric map (e.g.
/// `/node/bm/net/if`). Missing paths yield nothing (`None`), never an
/// error — the catalogs are the only source of schema.
#[derive(Debug, Default)]
pub struct MetricStore {
    roots: DashMap<String, StoreNode>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self { roots: DashMap::new() }
    }

    fn resolve(&self, path: &[&str]) -> Option<StoreNode> {
        let mut node = get_child(&self.roots, path.first()?)?;
        for seg in &path[1..] {
            let StoreNode::Bucket(b) = &node else {
                return None;
            };
            node = get_child(b, seg)?;
        }
        Some(node)
    }

    /// Read a snapshot (clone) of the ring buffer at `path`, or `None` if
    /// no such leaf exists.
    pub fn get_rb(&self, path: &[&str]) -> Option<RingBuffer> {
        match self.resolve(path)? {
            StoreNode::Leaf(rb) => Some(rb.read().clone()),
            StoreNode::Bucket(_) => None,
        }
    }

    /// Append a sample to the ring buffer at `path`, creating it (and any
    /// intermediate buckets) from `init` if absent.
    pub fn append(&self, path: &[&str], init: impl FnOnce() -> RingBuffer, value: impl crate::store::ring_buffer::IntoScalar) {
        if path.is_empty() {
            return;
        }
        let mut bucket = get_or_insert_bucket(&self.roots, path[0]);
        for seg in &path[1..path.len() - 1] {
            bucket = get_or_insert_bucket(&bucket, seg);
        }
        let last = path[path.len() - 1];
        let entry = bucket
            .entry(last.to_string())
            .or_insert_with(|| StoreNode::Leaf(Arc::new(RwLock::new(init()))));
        match entry.value() {
            StoreNode::Leaf(rb) => rb.write().append(value),
            StoreNode::Bucket(_) => {}
        }
    }

    /// Replace (or create) the ring buffer at `path` wholesale. Used by
    /// collectors/tests seeding raw samples directly.
    pub fn set_rb(&self, path: &[&str], rb: RingBuffer) {
        if path.is_empty() {
            return;
        }
        let mut bucket = get_or_insert_bucket(&self.roots, path[0]);
        for seg in &path[1..path.len() - 1] {
            bucket = get_or_insert_bucket(&bucket, seg);
        }
        let last = path[path.len() - 1];
        bucket.insert(last.to_string(), StoreNode::Leaf(Arc::new(RwLock::new(rb))));
    }

    /// Ensure a bucket (sub-mapping) exists at `path`, without touching
    /// any leaf. Used when a subservice needs an empty index bucket
    /// before anything has been observed yet.
    pub fn ensure_bucket(&self, path: &[&str]) {
        if path.is_empty() {
            return;
        }
        let mut bucket = get_or_insert_bucket(&self.roots, path[0]);
        for seg in &path[1..] {
            bucket = get_or_insert_bucket(&bucket, seg);
        }
    }

    /// The keys of the bucket at `path` (e.g. interface names under
    /// `net/dev`), or an empty vec if no such bucket exists.
    pub fn index_keys(&self, path: &[&str]) -> Vec<String> {
        match self.resolve(path) {
            Some(StoreNode::Bucket(b)) => b.iter().map(|e| e.key().clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `path` resolves to a bucket or a leaf at all.
    pub fn contains(&self, path: &[&str]) -> bool {
        self.resolve(path).is_some()
    }

    /// Whether `path` resolves to a ring buffer leaf.
    pub fn contains_leaf(&self, path: &[&str]) -> bool {
        matches!(self.resolve(path), Some(StoreNode::Leaf(_)))
    }

    /// Remove a single key from the bucket at `parent_path`. Reserved for
    /// explicit administrative hard-removal; the tick path never calls
    /// this (soft removal only, see [`crate::graph`]).
    pub fn remove_entry(&self, parent_path: &[&str], key: &str) {
        if let Some(StoreNode::Bucket(b)) = self.resolve(parent_path) {
            b.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ring_buffer::ScalarKind;

    #[test]
    fn append_and_read_nested_path() {
        let store = MetricStore::new();
        store.append(
            &["net/dev", "eth0", "rx_drop"],
            || RingBuffer::new("rx_drop", ScalarKind::Int).with_counter(true),
            5i64,
        );
        let rb = store.get_rb(&["net/dev", "eth0", "rx_drop"]).unwrap();
        assert_eq!(rb.top().as_f64(), 5.0);
    }

    #[test]
    fn missing_path_yields_none_not_error() {
        let store = MetricStore::new();
        assert!(store.get_rb(&["does/not", "exist"]).is_none());
        assert!(store.index_keys(&["does/not"]).is_empty());
    }

    #[test]
    fn index_keys_lists_bucket_children() {
        let store = MetricStore::new();
        for iface in ["eth0", "eth1"] {
            store.append(
                &["net/dev", iface, "rx_bytes"],
                || RingBuffer::new("rx_bytes", ScalarKind::Int),
                1i64,
            );
        }
        let mut keys = store.index_keys(&["net/dev"]);
        keys.sort();
        assert_eq!(keys, vec!["eth0".to_string(), "eth1".to_string()]);
    }
}
