//! Forward path and loop enumeration.
//!
//! Both searches are depth-first over outgoing branches in insertion order,
//! with an explicit frame stack so graph depth never touches the call stack.
//! A node is never entered twice on the current walk, so every result is
//! elementary.

use sfg_core::{BranchId, NodeId};
use tracing::{debug, trace};

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::indexing::IndexMap;
use crate::path::{Path, PathList};

/// Depth-first search state shared by both enumerations.
struct Search<'g> {
    graph: &'g Graph,
    index: IndexMap,
    /// Nodes on the current walk.
    on_walk: Vec<bool>,
    /// Nodes excluded from the search entirely.
    blocked: Vec<bool>,
    walk: Vec<BranchId>,
    found: PathList,
}

impl<'g> Search<'g> {
    fn new(graph: &'g Graph) -> Self {
        let index = IndexMap::from_graph(graph);
        let n = index.node_count();
        Self {
            graph,
            index,
            on_walk: vec![false; n],
            blocked: vec![false; n],
            walk: Vec::new(),
            found: PathList::new(),
        }
    }

    /// Record every walk from `start` that ends on `target`.
    ///
    /// `start` itself is not marked; a walk that comes back to it is only
    /// accepted when it is the target.
    fn run(&mut self, start: NodeId, target: NodeId) -> GraphResult<()> {
        let mut frames: Vec<(NodeId, usize)> = vec![(start, 0)];

        while let Some(top) = frames.last_mut() {
            let (node, next) = *top;
            let Some(&branch_id) = self.graph.outgoing(node).get(next) else {
                frames.pop();
                if !frames.is_empty() {
                    self.walk.pop();
                    let i = self.index.node_idx(node)?;
                    self.on_walk[i] = false;
                }
                continue;
            };
            top.1 += 1;

            let dest = self
                .graph
                .branch(branch_id)
                .ok_or(GraphError::BranchNotFound { branch: branch_id })?
                .dest;
            let d = self.index.node_idx(dest)?;
            if self.blocked[d] || self.on_walk[d] {
                continue;
            }

            self.walk.push(branch_id);
            if dest == target {
                trace!(len = self.walk.len(), "recorded walk");
                self.found.push(Path::new(self.walk.clone()));
                self.walk.pop();
            } else {
                self.on_walk[d] = true;
                frames.push((dest, 0));
            }
        }
        Ok(())
    }
}

/// Every elementary loop of the graph, each reported once.
///
/// Nodes are taken as anchors in creation order. Each anchor's loops are
/// those through it that avoid all earlier anchors, so a loop is found from
/// its earliest node only.
pub fn find_loops(graph: &Graph) -> GraphResult<PathList> {
    let mut search = Search::new(graph);
    for i in 0..search.index.node_count() {
        let anchor = search.index.node_id(i);
        search.run(anchor, anchor)?;
        search.blocked[i] = true;
    }
    debug!(
        loops = search.found.len(),
        nodes = graph.node_count(),
        "enumerated loops"
    );
    Ok(search.found)
}

/// Every forward path from `input` to `output`: walks that visit no node
/// twice and never pass back through `input`.
///
/// `input == output` has no forward paths.
pub fn find_forward_paths(
    graph: &Graph,
    input: NodeId,
    output: NodeId,
) -> GraphResult<PathList> {
    graph
        .node(input)
        .ok_or(GraphError::NodeNotFound { node: input })?;
    graph
        .node(output)
        .ok_or(GraphError::NodeNotFound { node: output })?;
    if input == output {
        return Ok(PathList::new());
    }

    let mut search = Search::new(graph);
    let i = search.index.node_idx(input)?;
    search.on_walk[i] = true;
    search.run(input, output)?;
    debug!(paths = search.found.len(), "enumerated forward paths");
    Ok(search.found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GraphBuilder;

    fn node_names(graph: &Graph, path: &Path) -> Vec<String> {
        path.nodes(graph)
            .unwrap()
            .into_iter()
            .map(|id| graph.node(id).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn empty_graph() {
        assert!(find_loops(&Graph::new()).unwrap().is_empty());
    }

    #[test]
    fn self_loop() {
        let mut b = GraphBuilder::new();
        b.add_node("n1");
        b.add_node("n2");
        b.add_node("n3");
        b.connect("n1", "n1", None).connect("n2", "n3", None);
        let g = b.build().unwrap();

        let loops = find_loops(&g).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 1);
        assert_eq!(node_names(&g, &loops[0]), ["n1"]);
    }

    #[test]
    fn parallel_self_loops_are_distinct() {
        let mut b = GraphBuilder::new();
        b.add_node("n");
        b.connect("n", "n", Some("a")).connect("n", "n", Some("b"));
        let g = b.build().unwrap();
        let loops = find_loops(&g).unwrap();
        assert_eq!(loops.len(), 2);
        assert_ne!(loops[0], loops[1]);
    }

    #[test]
    fn in_equals_out() {
        let mut b = GraphBuilder::new();
        let n = b.add_node("n");
        b.connect("n", "n", None);
        let g = b.build().unwrap();
        assert!(find_forward_paths(&g, n, n).unwrap().is_empty());
    }

    #[test]
    fn unknown_endpoints() {
        let mut b = GraphBuilder::new();
        let n = b.add_node("n");
        let g = b.build().unwrap();
        let ghost = NodeId::from_index(3);
        assert_eq!(
            find_forward_paths(&g, n, ghost),
            Err(GraphError::NodeNotFound { node: ghost })
        );
    }

    #[test]
    fn walks_never_revisit_input() {
        // n1 -> n2 -> n3, with n2 -> n2 and n2 -> n1
        let mut b = GraphBuilder::new();
        let n1 = b.add_node("n1");
        b.add_node("n2");
        let n3 = b.add_node("n3");
        b.connect("n1", "n2", None)
            .connect("n2", "n3", None)
            .connect("n2", "n2", None)
            .connect("n2", "n1", None);
        let g = b.build().unwrap();

        let paths = find_forward_paths(&g, n1, n3).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(node_names(&g, &paths[0]), ["n1", "n2", "n3"]);
    }
}
