//! Live trace-state handle consumed by the export pass.

use crate::ir::{Graph, NodeId};
use std::collections::HashMap;

/// Opaque key identifying an external buffer (e.g. a parameter's storage).
///
/// The trace state keeps a correspondence from these keys to the graph nodes
/// holding the buffer's value; the export pass re-keys the map through its
/// node mapping when it swaps in the rewritten graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferKey(pub u64);

/// State of a completed trace: the recorded graph, the buffer correspondence
/// map, and a lifecycle flag.
///
/// The export pass requires a live (non-expired) state and mutates it in
/// place only at the very end of a successful run; a failed run leaves the
/// state untouched.
#[derive(Debug, Clone, Default)]
pub struct TraceState {
    /// The traced computation graph.
    pub graph: Graph,

    /// Correspondence from external buffer keys to graph nodes.
    pub buffer_map: HashMap<BufferKey, NodeId>,

    /// Set once the trace's backing storage has been released.
    expired: bool,
}

impl TraceState {
    /// Create a live trace state around a recorded graph.
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            buffer_map: HashMap::new(),
            expired: false,
        }
    }

    /// Check whether the trace has expired. An expired state cannot be
    /// exported.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Mark the trace as expired.
    pub fn expire(&mut self) {
        self.expired = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_state_lifecycle() {
        let mut state = TraceState::new(Graph::new());
        assert!(!state.is_expired());

        state.expire();
        assert!(state.is_expired());
    }

    #[test]
    fn test_buffer_map() {
        let mut state = TraceState::new(Graph::new());
        state.buffer_map.insert(BufferKey(42), 0);
        assert_eq!(state.buffer_map.get(&BufferKey(42)), Some(&0));
    }
}
