//! The dependency graph: a strict tree rooted at the host node, with
//! path-based lookup and depth-first traversal.

use crate::graph::node::{Node, NodeKind};

/// The static baremetal subtree created once at startup and never torn
/// down: `cpus`, `sensors`, `disks`, `mem`, `proc`, `net` under `bm`.
const STATIC_BAREMETAL_CHILDREN: &[&str] = &["cpus", "sensors", "disks", "mem", "proc", "net"];

pub struct DependencyGraph {
    pub root: Node,
}

impl DependencyGraph {
    pub fn new(host_name: &str) -> Self {
        let mut root = Node::root(host_name);
        let mut bm = root.child(NodeKind::Baremetal, "bm", None, true);
        for label in STATIC_BAREMETAL_CHILDREN {
            let child = bm.child(NodeKind::Generic, *label, None, true);
            bm.children.push(child);
        }
        root.children.push(bm);
        DependencyGraph { root }
    }

    pub fn baremetal(&self) -> &Node {
        self.root.find_child("bm", None).expect("static baremetal subtree always present")
    }

    pub fn baremetal_mut(&mut self) -> &mut Node {
        self.root.find_child_mut("bm", None).expect("static baremetal subtree always present")
    }

    /// Look up a node by its kind-qualified path with optional instance
    /// keys, e.g. `/node/bm/net/if[name=eth0]`. Returns `None` if any
    /// segment fails to resolve.
    pub fn get_node(&self, fullname_or_path: &str) -> Option<&Node> {
        let mut segments = fullname_or_path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let (first_label, first_instance) = parse_segment(first);
        if first_label != self.root.type_label
            || (first_instance.is_some() && first_instance.as_deref() != self.root.instance.as_deref())
        {
            return None;
        }
        let mut node = &self.root;
        for seg in segments {
            let (label, instance) = parse_segment(seg);
            node = node.find_child(label, instance.as_deref())?;
        }
        Some(node)
    }

    pub fn get_node_mut(&mut self, fullname_or_path: &str) -> Option<&mut Node> {
        let mut segments = fullname_or_path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let (first_label, _) = parse_segment(first);
        if first_label != self.root.type_label {
            return None;
        }
        let mut node = &mut self.root;
        for seg in segments {
            let (label, instance) = parse_segment(seg);
            node = node.find_child_mut(label, instance.as_deref())?;
        }
        Some(node)
    }

    /// All nodes, depth-first pre-order, including the root.
    pub fn iter_depth_first(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.root.walk(&mut out);
        out
    }
}

/// Parses one path segment, e.g. `if[name=eth0]` -> (`if`, Some(`eth0`)).
fn parse_segment(segment: &str) -> (&str, Option<String>) {
    match segment.find('[') {
        Some(idx) => {
            let label = &segment[..idx];
            let rest = &segment[idx + 1..segment.len().saturating_sub(1)];
            let instance = rest.strip_prefix("name=").map(|s| s.to_string());
            (label, instance)
        }
        None => (segment, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_subtree_is_present_at_construction() {
        let graph = DependencyGraph::new("host1");
        assert!(graph.get_node("/node/bm/cpus").is_some());
        assert!(graph.get_node("/node/bm/net").is_some());
    }

    #[test]
    fn round_trip_fullname_lookup() {
        let mut graph = DependencyGraph::new("host1");
        let bm = graph.baremetal_mut();
        let net = bm.find_child_mut("net", None).unwrap();
        let if_node = net.child(NodeKind::Generic, "if", Some("eth0".to_string()), true);
        let fullname = if_node.fullname.clone();
        net.children.push(if_node);

        let found = graph.get_node(&fullname).unwrap();
        assert_eq!(found.fullname, fullname);
    }

    #[test]
    fn missing_path_segment_yields_none() {
        let graph = DependencyGraph::new("host1");
        assert!(graph.get_node("/node/bm/does-not-exist").is_none());
    }
}
