//! Registry cross-checks.
//!
//! A branch lives in three places: the branch registry, its source's outgoing
//! list and its destination's incoming list. These checks confirm all three
//! agree, which every mutation in [`Graph`] is expected to preserve.

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

pub(crate) fn validate_registrations(graph: &Graph) -> GraphResult<()> {
    validate_slots(graph)?;
    validate_branches(graph)?;
    validate_adjacency(graph)?;
    Ok(())
}

/// Every entity sits in the slot its ID names, and the live counts match.
fn validate_slots(graph: &Graph) -> GraphResult<()> {
    for (slot, node) in graph.nodes.iter().enumerate() {
        if let Some(node) = node
            && node.id.slot() != slot
        {
            return Err(GraphError::IdNotFound { what: "NodeId" });
        }
    }
    for (slot, branch) in graph.branches.iter().enumerate() {
        if let Some(branch) = branch
            && branch.id.slot() != slot
        {
            return Err(GraphError::IdNotFound { what: "BranchId" });
        }
    }
    if graph.nodes().count() != graph.node_count {
        return Err(GraphError::IdNotFound { what: "node count" });
    }
    if graph.branches().count() != graph.branch_count {
        return Err(GraphError::IdNotFound { what: "branch count" });
    }
    Ok(())
}

/// Every branch appears exactly once at each endpoint.
fn validate_branches(graph: &Graph) -> GraphResult<()> {
    for branch in graph.branches() {
        let source = graph.node(branch.source).ok_or(GraphError::NodeNotFound {
            node: branch.source,
        })?;
        let dest = graph
            .node(branch.dest)
            .ok_or(GraphError::NodeNotFound { node: branch.dest })?;

        let out = source.outgoing().iter().filter(|&&b| b == branch.id).count();
        if out != 1 {
            return Err(GraphError::InconsistentAdjacency {
                branch: branch.id,
                node: branch.source,
            });
        }
        let inc = dest.incoming().iter().filter(|&&b| b == branch.id).count();
        if inc != 1 {
            return Err(GraphError::InconsistentAdjacency {
                branch: branch.id,
                node: branch.dest,
            });
        }
    }
    Ok(())
}

/// Every adjacency entry names a live branch with the right endpoint.
fn validate_adjacency(graph: &Graph) -> GraphResult<()> {
    for node in graph.nodes() {
        for &id in node.outgoing() {
            match graph.branch(id) {
                Some(branch) if branch.source == node.id => {}
                _ => {
                    return Err(GraphError::InconsistentAdjacency {
                        branch: id,
                        node: node.id,
                    });
                }
            }
        }
        for &id in node.incoming() {
            match graph.branch(id) {
                Some(branch) if branch.dest == node.id => {}
                _ => {
                    return Err(GraphError::InconsistentAdjacency {
                        branch: id,
                        node: node.id,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Graph {
        let mut g = Graph::new();
        let a = g.create_node("a").unwrap();
        let b = g.create_node("b").unwrap();
        g.connect(a, b, None).unwrap();
        g
    }

    #[test]
    fn consistent_graph_passes() {
        validate_registrations(&pair()).unwrap();
    }

    #[test]
    fn duplicate_outgoing_entry() {
        let mut g = pair();
        let a = g.find_node("a").unwrap();
        let ab = g.outgoing(a)[0];
        if let Some(node) = g.nodes[a.slot()].as_mut() {
            node.outgoing.push(ab);
        }
        assert_eq!(
            validate_registrations(&g),
            Err(GraphError::InconsistentAdjacency { branch: ab, node: a })
        );
    }

    #[test]
    fn dangling_incoming_entry() {
        let mut g = pair();
        let b = g.find_node("b").unwrap();
        let ab = g.incoming(b)[0];
        g.branches[ab.slot()] = None;
        g.branch_count -= 1;
        assert_eq!(
            validate_registrations(&g),
            Err(GraphError::InconsistentAdjacency {
                branch: ab,
                node: g.find_node("a").unwrap()
            })
        );
    }
}
