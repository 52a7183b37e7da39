//! Dense indexing for traversal state.
//!
//! Node IDs keep their slot position after deletions, so the live
//! set can be sparse. Algorithms that keep per-node flags work on contiguous
//! indices `0..N` instead.

use sfg_core::NodeId;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

/// Bidirectional mapping between node IDs and contiguous indices.
#[derive(Debug, Clone)]
pub struct IndexMap {
    /// index -> NodeId, in creation order.
    node_ids: Vec<NodeId>,

    /// Sized to max(NodeId.slot) + 1; None for destroyed slots.
    node_to_idx: Vec<Option<usize>>,
}

impl IndexMap {
    pub fn from_graph(graph: &Graph) -> Self {
        let node_ids: Vec<NodeId> = graph.nodes().map(|n| n.id).collect();
        Self {
            node_to_idx: reverse(&node_ids),
            node_ids,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Contiguous index of a node.
    pub fn node_idx(&self, id: NodeId) -> GraphResult<usize> {
        self.node_to_idx
            .get(id.slot())
            .and_then(|&opt| opt)
            .ok_or(GraphError::IdNotFound { what: "NodeId" })
    }

    /// Node ID at a contiguous index (panics if out of bounds).
    pub fn node_id(&self, i: usize) -> NodeId {
        self.node_ids[i]
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }
}

fn reverse(ids: &[NodeId]) -> Vec<Option<usize>> {
    let len = ids.iter().map(|id| id.slot() + 1).max().unwrap_or(0);
    let mut to_idx = vec![None; len];
    for (i, id) in ids.iter().enumerate() {
        to_idx[id.slot()] = Some(i);
    }
    to_idx
}
