//! Reconciles the dependency graph against the live metric store each
//! tick: adds newly observed entities, soft-removes vanished ones, never
//! deletes. Driven exclusively by store contents — no external
//! membership configuration is consulted.

use crate::catalog::metrics::MetricCatalog;
use crate::graph::node::{Node, NodeKind};
use crate::graph::tree::DependencyGraph;
use crate::store::metric_store::MetricStore;

/// Named input buckets the (externally supplied) collectors write into.
pub mod buckets {
    pub const NET_DEV: &str = "net/dev";
    pub const STAT_CPU: &str = "stat/cpu";
    pub const DISKSTATS: &str = "diskstats";
    pub const SENSORS: &str = "sensors";
    pub const VIRTUALBOX_VMS: &str = "virtualbox/vms";
    pub const VPP_STATS_IF: &str = "vpp/stats/if";
    pub const VPP_GNMI: &str = "vpp/gnmi";
}

pub struct GraphUpdater {
    pub local_kb_supported: bool,
}

impl GraphUpdater {
    pub fn new(local_kb_supported: bool) -> Self {
        Self { local_kb_supported }
    }

    /// Runs one reconciliation pass. Returns whether the tree's shape
    /// changed (used to bump `dependency_graph_changed` exactly once).
    pub fn tick(&self, graph: &mut DependencyGraph, store: &MetricStore, metrics: &MetricCatalog, tick: u64) -> bool {
        let mut changed = false;

        changed |= self.reconcile_baremetal(graph, store, metrics);
        changed |= self.reconcile_vms(graph, store, metrics);
        changed |= self.reconcile_kb(graph, store, metrics);

        if changed {
            graph.root.dependency_graph_changed = tick;
        }
        changed
    }

    fn reconcile_baremetal(&self, graph: &mut DependencyGraph, store: &MetricStore, metrics: &MetricCatalog) -> bool {
        let mut changed = false;
        let bm = graph.baremetal_mut();

        if let Some(cpus) = bm.find_child_mut("cpus", None) {
            let want = store.index_keys(&[buckets::STAT_CPU]);
            changed |= reconcile_indexed(cpus, NodeKind::Generic, "cpu", true, &want, metrics, "cpus/cpu");
        }
        if let Some(net) = bm.find_child_mut("net", None) {
            let want = store.index_keys(&[buckets::NET_DEV]);
            changed |= reconcile_indexed(net, NodeKind::Generic, "if", true, &want, metrics, "net/if");
        }
        if let Some(disks) = bm.find_child_mut("disks", None) {
            let want = store.index_keys(&[buckets::DISKSTATS]);
            changed |= reconcile_indexed(disks, NodeKind::Generic, "disk", true, &want, metrics, "disks/disk");
        }
        if let Some(sensors) = bm.find_child_mut("sensors", None) {
            let want = store.index_keys(&[buckets::SENSORS]);
            changed |= reconcile_indexed(sensors, NodeKind::Generic, "sensor", false, &want, metrics, "sensors/sensor");
        }
        changed
    }

    fn reconcile_vms(&self, graph: &mut DependencyGraph, store: &MetricStore, metrics: &MetricCatalog) -> bool {
        let want = store.index_keys(&[buckets::VIRTUALBOX_VMS]);
        let mut changed = reconcile_indexed(&mut graph.root, NodeKind::Vm, "vm", true, &want, metrics, "vm");

        for vm_name in &want {
            let Some(vm) = graph.root.find_child_mut("vm", Some(vm_name.as_str())) else {
                continue;
            };
            ensure_standard_subtree(vm);
            let cpu_keys = store.index_keys(&[buckets::VIRTUALBOX_VMS, vm_name.as_str(), "cpu"]);
            if let Some(cpus) = vm.find_child_mut("cpus", None) {
                changed |= reconcile_indexed(cpus, NodeKind::Generic, "cpu", true, &cpu_keys, metrics, "cpus/cpu");
            }
            let if_keys = store.index_keys(&[buckets::VIRTUALBOX_VMS, vm_name.as_str(), "net"]);
            if let Some(net) = vm.find_child_mut("net", None) {
                changed |= reconcile_indexed(net, NodeKind::Generic, "if", true, &if_keys, metrics, "net/if");
            }
        }
        changed
    }

    fn reconcile_kb(&self, graph: &mut DependencyGraph, store: &MetricStore, metrics: &MetricCatalog) -> bool {
        let mut want: Vec<String> = store.index_keys(&[buckets::VPP_GNMI]);
        if self.local_kb_supported {
            want.push("localhost".to_string());
        }
        let mut changed = reconcile_indexed(&mut graph.root, NodeKind::Kb, "kb", true, &want, metrics, "kb");

        for kb_name in &want {
            let Some(kb) = graph.root.find_child_mut("kb", Some(kb_name.as_str())) else {
                continue;
            };
            ensure_standard_subtree(kb);
            let if_bucket_path: Vec<String> = if kb_name.as_str() == "localhost" {
                vec![buckets::VPP_STATS_IF.to_string()]
            } else {
                vec![buckets::VPP_GNMI.to_string(), kb_name.clone(), "net_if".to_string()]
            };
            let refs: Vec<&str> = if_bucket_path.iter().map(String::as_str).collect();
            let if_keys = store.index_keys(&refs);
            if let Some(net) = kb.find_child_mut("net", None) {
                changed |= reconcile_indexed(net, NodeKind::Generic, "if", true, &if_keys, metrics, "net/if");
            }
        }
        changed
    }
}

/// Ensures a VM/KB instance has its standard `cpus`/`net` children as
/// empty containers, created once on first observation.
fn ensure_standard_subtree(node: &mut Node) {
    if node.find_child("cpus", None).is_none() {
        let child = node.child(NodeKind::Generic, "cpus", None, true);
        node.children.push(child);
    }
    if node.find_child("net", None).is_none() {
        let child = node.child(NodeKind::Generic, "net", None, true);
        node.children.push(child);
    }
}

/// Adds children present in `want` but missing, and soft-removes (marks
/// inactive) children absent from `want`. Returning entities are
/// reactivated. `catalog_key` names the subservice template used to
/// pre-allocate the child's metric RBs — currently informational, since
/// RB allocation happens lazily on first metric write.
#[allow(clippy::too_many_arguments)]
fn reconcile_indexed(
    parent: &mut Node,
    kind: NodeKind,
    type_label: &str,
    impacting: bool,
    want: &[String],
    _metrics: &MetricCatalog,
    _catalog_key: &str,
) -> bool {
    let mut changed = false;

    for key in want {
        match parent.find_child_mut(type_label, Some(key.as_str())) {
            Some(existing) => {
                if !existing.active {
                    existing.active = true;
                    changed = true;
                }
            }
            None => {
                let child = parent.child(kind, type_label, Some(key.clone()), impacting);
                parent.children.push(child);
                changed = true;
            }
        }
    }

    for child in parent.children.iter_mut().filter(|c| c.type_label == type_label) {
        let still_present = child.instance.as_ref().is_some_and(|i| want.contains(i));
        if !still_present && child.active {
            child.active = false;
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ring_buffer::{RingBuffer, ScalarKind};

    fn empty_catalog() -> MetricCatalog {
        MetricCatalog::default()
    }

    #[test]
    fn adds_then_soft_removes_vanished_vm() {
        let mut graph = DependencyGraph::new("host1");
        let store = MetricStore::new();
        store.append(&[buckets::VIRTUALBOX_VMS, "vm1", "state"], || RingBuffer::new("state", ScalarKind::String), "running");
        let updater = GraphUpdater::new(false);
        let metrics = empty_catalog();

        updater.tick(&mut graph, &store, &metrics, 1);
        assert!(graph.root.find_child("vm", Some("vm1")).unwrap().active);

        store.remove_entry(&[buckets::VIRTUALBOX_VMS], "vm1");
        updater.tick(&mut graph, &store, &metrics, 2);
        assert!(!graph.root.find_child("vm", Some("vm1")).unwrap().active);
        // soft removal: node stays in the tree
        assert!(graph.root.find_child("vm", Some("vm1")).is_some());
    }

    #[test]
    fn localhost_kb_added_when_locally_supported() {
        let mut graph = DependencyGraph::new("host1");
        let store = MetricStore::new();
        let updater = GraphUpdater::new(true);
        let metrics = empty_catalog();
        updater.tick(&mut graph, &store, &metrics, 1);
        assert!(graph.root.find_child("kb", Some("localhost")).is_some());
    }
}
