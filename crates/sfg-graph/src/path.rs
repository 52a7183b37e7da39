//! Branch sequences: forward paths and loops.

use sfg_core::{BranchId, NodeId};
use sfg_expr::Expr;

use crate::error::{GraphError, GraphResult};
use crate::graph::{Branch, Graph};

/// An ordered list of branches, each starting where the previous one ends.
///
/// A path whose last branch ends at the first branch's source is a loop.
/// Paths hold IDs only and are resolved against the graph they came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    branches: Vec<BranchId>,
}

/// Paths in discovery order.
pub type PathList = Vec<Path>;

impl Path {
    pub fn new(branches: Vec<BranchId>) -> Self {
        Self { branches }
    }

    pub fn branches(&self) -> &[BranchId] {
        &self.branches
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Nodes visited in order. A loop lists each node once, starting at its
    /// anchor; an open path also lists its final node.
    pub fn nodes(&self, graph: &Graph) -> GraphResult<Vec<NodeId>> {
        let mut nodes = Vec::with_capacity(self.branches.len() + 1);
        let mut last = None;
        for &id in &self.branches {
            let branch = resolve(graph, id)?;
            nodes.push(branch.source);
            last = Some(branch.dest);
        }
        if let Some(end) = last
            && nodes.first() != Some(&end)
        {
            nodes.push(end);
        }
        Ok(nodes)
    }

    /// True when the path returns to where it started.
    pub fn is_loop(&self, graph: &Graph) -> bool {
        let ends = self
            .branches
            .first()
            .zip(self.branches.last())
            .and_then(|(&first, &last)| Some((graph.branch(first)?, graph.branch(last)?)));
        matches!(ends, Some((first, last)) if first.source == last.dest)
    }

    /// True when consecutive branches share their joint node.
    pub fn is_connected(&self, graph: &Graph) -> bool {
        self.branches.windows(2).all(|pair| {
            match (graph.branch(pair[0]), graph.branch(pair[1])) {
                (Some(a), Some(b)) => a.dest == b.source,
                _ => false,
            }
        })
    }

    /// True when the two paths share at least one node.
    pub fn touches(&self, other: &Path, graph: &Graph) -> GraphResult<bool> {
        let ours = self.nodes(graph)?;
        let theirs = other.nodes(graph)?;
        Ok(ours.iter().any(|n| theirs.contains(n)))
    }

    /// Product of the branch weights, left to right. An empty path has gain 1.
    pub fn gain(&self, graph: &Graph) -> GraphResult<Expr> {
        let mut weights = self
            .branches
            .iter()
            .map(|&id| resolve(graph, id).map(|b| b.weight.clone()));
        let Some(first) = weights.next() else {
            return Ok(Expr::literal(1.0));
        };
        weights.try_fold(first?, |acc, w| Ok(acc * w?))
    }
}

fn resolve(graph: &Graph, id: BranchId) -> GraphResult<&Branch> {
    graph
        .branch(id)
        .ok_or(GraphError::BranchNotFound { branch: id })
}
