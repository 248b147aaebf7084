//! Copies and normalizes raw collector input into each active node's own
//! metric ring buffers, via an OS x subservice-path dispatch table.
//! Traversal is top-down and skips inactive subtrees: their RBs stop
//! advancing but keep their history.

use crate::graph::tree::DependencyGraph;
use crate::graph::Node;
use crate::store::metric_store::MetricStore;
use crate::store::ring_buffer::{RingBuffer, ScalarKind};

use crate::graph::updater::buckets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    Windows,
    MacOs,
}

type CopyFn = fn(&MetricStore, &Node);

/// One dispatch entry: the kind-only node path it applies to, and the
/// routine that copies that path's raw inputs into normalized RBs.
struct DispatchEntry {
    path: &'static str,
    copy: CopyFn,
}

pub struct MetricUpdater {
    host_os: HostOs,
    table: Vec<DispatchEntry>,
}

impl MetricUpdater {
    pub fn new(host_os: HostOs) -> Self {
        let table = match host_os {
            HostOs::Linux => linux_table(),
            HostOs::Windows | HostOs::MacOs => Vec::new(),
        };
        Self { host_os, table }
    }

    pub fn host_os(&self) -> HostOs {
        self.host_os
    }

    /// Walks the tree top-down, applying the dispatch entry matching
    /// each active node's path.
    pub fn tick(&self, graph: &DependencyGraph, store: &MetricStore) {
        for node in graph.iter_depth_first() {
            if !node.active {
                continue;
            }
            if let Some(entry) = self.table.iter().find(|e| e.path == node.path) {
                (entry.copy)(store, node);
            }
        }
    }
}

fn linux_table() -> Vec<DispatchEntry> {
    vec![
        DispatchEntry { path: "/node/bm/cpus/cpu", copy: copy_cpu_linux },
        DispatchEntry { path: "/node/vm/cpus/cpu", copy: copy_cpu_linux },
        DispatchEntry { path: "/node/bm/net/if", copy: copy_net_if_linux },
        DispatchEntry { path: "/node/vm/net/if", copy: copy_net_if_linux },
        DispatchEntry { path: "/node/kb/net/if", copy: copy_kb_net_if_linux },
        DispatchEntry { path: "/node/bm/disks/disk", copy: copy_disk_linux },
        DispatchEntry { path: "/node/bm/sensors/sensor", copy: copy_sensor_linux },
    ]
}

fn dest_path<'a>(node: &'a Node, name: &'a str, buf: &'a mut Vec<String>) -> Vec<&'a str> {
    *buf = node.metric_base();
    let mut path: Vec<&str> = buf.iter().map(String::as_str).collect();
    path.push(name);
    path
}

fn forward_counter(store: &MetricStore, src: &[&str], node: &Node, name: &str, scale: f64) {
    let Some(raw) = store.get_rb(src) else { return };
    let value = raw.top().as_f64() / scale;
    let mut buf = Vec::new();
    let path = dest_path(node, name, &mut buf);
    store.append(&path, || RingBuffer::new(name, ScalarKind::Float).with_counter(true), value);
}

fn forward_gauge(store: &MetricStore, src: &[&str], node: &Node, name: &str) {
    let Some(raw) = store.get_rb(src) else { return };
    let value = raw.top().as_f64();
    let mut buf = Vec::new();
    let path = dest_path(node, name, &mut buf);
    store.append(&path, || RingBuffer::new(name, ScalarKind::Float), value);
}

/// `idle_time`: percentage of the tick interval spent idle, derived from
/// the ratio of jiffy-counter deltas (jiffies -> ms is implicit in the
/// ratio, so no explicit unit conversion is needed here).
fn copy_cpu_linux(store: &MetricStore, node: &Node) {
    let Some(instance) = node.instance.as_deref() else { return };
    let idle = store.get_rb(&[buckets::STAT_CPU, instance, "idle"]);
    let total = store.get_rb(&[buckets::STAT_CPU, instance, "total"]);
    let (Some(idle), Some(total)) = (idle, total) else { return };
    let d_idle = idle.delta(1).unwrap_or(0.0);
    let d_total = total.delta(1).unwrap_or(0.0);
    let pct = if d_total != 0.0 { (d_idle / d_total) * 100.0 } else { 0.0 };
    let mut buf = Vec::new();
    let path = dest_path(node, "idle_time", &mut buf);
    store.append(&path, || RingBuffer::new("idle_time", ScalarKind::Float), pct);
}

/// Byte counters normalize bytes -> kB; packet/drop counters pass through.
fn copy_net_if_linux(store: &MetricStore, node: &Node) {
    let Some(instance) = node.instance.as_deref() else { return };
    let bucket = if node.path.starts_with("/node/vm") {
        [buckets::VIRTUALBOX_VMS, instance]
    } else {
        [buckets::NET_DEV, instance]
    };
    forward_counter(store, &[bucket[0], bucket[1], "rx_bytes"], node, "rx_bytes", 1024.0);
    forward_counter(store, &[bucket[0], bucket[1], "tx_bytes"], node, "tx_bytes", 1024.0);
    forward_counter(store, &[bucket[0], bucket[1], "rx_drop"], node, "rx_drop", 1.0);
    forward_counter(store, &[bucket[0], bucket[1], "tx_drop"], node, "tx_drop", 1.0);
}

fn copy_kb_net_if_linux(store: &MetricStore, node: &Node) {
    let Some(instance) = node.instance.as_deref() else { return };
    forward_counter(store, &[buckets::VPP_STATS_IF, instance, "rx_drop"], node, "rx_drop", 1.0);
    forward_counter(store, &[buckets::VPP_STATS_IF, instance, "tx_drop"], node, "tx_drop", 1.0);
}

fn copy_disk_linux(store: &MetricStore, node: &Node) {
    let Some(instance) = node.instance.as_deref() else { return };
    forward_counter(store, &[buckets::DISKSTATS, instance, "read_bytes"], node, "read_bytes", 1024.0);
    forward_counter(store, &[buckets::DISKSTATS, instance, "write_bytes"], node, "write_bytes", 1024.0);
}

fn copy_sensor_linux(store: &MetricStore, node: &Node) {
    let Some(instance) = node.instance.as_deref() else { return };
    forward_gauge(store, &[buckets::SENSORS, instance, "temp"], node, "temp");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::metrics::MetricCatalog;
    use crate::graph::updater::GraphUpdater;

    #[test]
    fn cpu_idle_time_derived_from_jiffy_deltas() {
        let store = MetricStore::new();
        store.append(&[buckets::STAT_CPU, "cpu0", "total"], || RingBuffer::new("total", ScalarKind::Int).with_counter(true), 100i64);
        store.append(&[buckets::STAT_CPU, "cpu0", "idle"], || RingBuffer::new("idle", ScalarKind::Int).with_counter(true), 50i64);
        store.append(&[buckets::STAT_CPU, "cpu0", "total"], || RingBuffer::new("total", ScalarKind::Int).with_counter(true), 200i64);
        store.append(&[buckets::STAT_CPU, "cpu0", "idle"], || RingBuffer::new("idle", ScalarKind::Int).with_counter(true), 60i64);

        let mut graph = DependencyGraph::new("h");
        let metrics = MetricCatalog::default();
        GraphUpdater::new(false).tick(&mut graph, &store, &metrics, 1);
        let updater = MetricUpdater::new(HostOs::Linux);
        updater.tick(&graph, &store);

        let node = graph.get_node("/node[name=h]/bm/cpus/cpu[name=cpu0]").unwrap();
        let rb = store.get_rb(&["metrics", node.fullname.as_str(), "idle_time"]).unwrap();
        assert_eq!(rb.top().as_f64(), 10.0);
    }
}
