//! Depth-first `jsonBag()` export over the whole tree, for consumers
//! (gNMI server, shared-memory mirror) that want every node's record in
//! one pass.

use crate::graph::tree::DependencyGraph;

pub fn export_all(graph: &DependencyGraph) -> Vec<serde_json::Value> {
    graph.iter_depth_first().into_iter().map(|n| n.json_bag()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_one_record_per_node() {
        let graph = DependencyGraph::new("h");
        let records = export_all(&graph);
        assert_eq!(records.len(), graph.iter_depth_first().len());
        assert_eq!(records[0]["id"], "/node[name=h]");
    }
}
