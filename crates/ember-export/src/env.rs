//! Node mapping from original-graph nodes to new-graph nodes.

use crate::error::{ExportError, Result};
use ember_core::ir::NodeId;
use std::collections::HashMap;

/// What an original node maps to in the new graph.
///
/// "Elided" is a distinct recorded state, not inferred from absence: a later
/// lookup must distinguish "never visited" (a visitation-order bug) from
/// "deliberately dropped" (a policy decision by a lowering rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    /// The node translated to this node of the new graph.
    Node(NodeId),

    /// The node's value was deliberately dropped by a lowering rule. Only
    /// legal for unused values; resolving it is a fatal contract violation.
    Elided,
}

/// Mapping from original-graph nodes to new-graph nodes, built incrementally
/// as nodes are visited in definition order.
///
/// Entries are written exactly once; an output may be elided but never
/// later un-elided.
#[derive(Debug, Default)]
pub struct NodeMap {
    entries: HashMap<NodeId, Mapping>,
}

impl NodeMap {
    /// Create a new empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `old` translated to `new`.
    pub fn insert(&mut self, old: NodeId, new: NodeId) {
        let previous = self.entries.insert(old, Mapping::Node(new));
        debug_assert!(previous.is_none(), "node {} mapped twice", old);
    }

    /// Record that `old` was deliberately dropped.
    pub fn elide(&mut self, old: NodeId) {
        let previous = self.entries.insert(old, Mapping::Elided);
        debug_assert!(previous.is_none(), "node {} mapped twice", old);
    }

    /// Check whether `old` has any entry (mapped or elided).
    pub fn contains(&self, old: NodeId) -> bool {
        self.entries.contains_key(&old)
    }

    /// Get the raw entry for `old`, if any.
    pub fn get(&self, old: NodeId) -> Option<Mapping> {
        self.entries.get(&old).copied()
    }

    /// Resolve `old` to its node in the new graph.
    ///
    /// Fails with [`ExportError::DanglingReference`] if `old` was never
    /// visited, and with [`ExportError::UsedElidedOutput`] if it was elided
    /// yet is being consulted by a consumer.
    pub fn resolve(&self, old: NodeId) -> Result<NodeId> {
        match self.entries.get(&old) {
            None => Err(ExportError::DanglingReference { node: old }),
            Some(Mapping::Elided) => Err(ExportError::UsedElidedOutput { node: old }),
            Some(Mapping::Node(new)) => Ok(*new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mapped() {
        let mut map = NodeMap::new();
        map.insert(3, 7);
        assert_eq!(map.resolve(3).unwrap(), 7);
        assert_eq!(map.get(3), Some(Mapping::Node(7)));
    }

    #[test]
    fn test_resolve_unvisited_is_dangling() {
        let map = NodeMap::new();
        assert!(matches!(
            map.resolve(0),
            Err(ExportError::DanglingReference { node: 0 })
        ));
        assert!(!map.contains(0));
    }

    #[test]
    fn test_resolve_elided_is_fatal() {
        let mut map = NodeMap::new();
        map.elide(5);
        assert!(map.contains(5));
        assert_eq!(map.get(5), Some(Mapping::Elided));
        assert!(matches!(
            map.resolve(5),
            Err(ExportError::UsedElidedOutput { node: 5 })
        ));
    }
}
