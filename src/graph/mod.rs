//! The subservice dependency graph: nodes, the tree, and the updater
//! that reconciles it against the live metric store each tick.

pub mod node;
pub mod tree;
pub mod updater;

pub use node::{Node, NodeKind, SymptomInstance};
pub use tree::DependencyGraph;
pub use updater::GraphUpdater;

use sha1::{Digest, Sha1};

/// Stable 160-bit id for a symptom, derived from its rule name.
pub fn symptom_id(rule_name: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(rule_name.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symptom_id_is_stable() {
        assert_eq!(symptom_id("cpu_high"), symptom_id("cpu_high"));
        assert_ne!(symptom_id("cpu_high"), symptom_id("cpu_low"));
    }
}
