//! Core graph data structures.

use std::fmt::Write as _;

use sfg_core::{BranchId, NodeId};
use sfg_expr::Expr;
use tracing::trace;

use crate::error::{GraphError, GraphResult};
use crate::validate;

/// A signal in the flow graph.
///
/// Branch lists keep insertion order; traversal order depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub(crate) outgoing: Vec<BranchId>,
    pub(crate) incoming: Vec<BranchId>,
}

impl Node {
    /// Branches leaving this node, oldest first.
    pub fn outgoing(&self) -> &[BranchId] {
        &self.outgoing
    }

    /// Branches entering this node, oldest first.
    pub fn incoming(&self) -> &[BranchId] {
        &self.incoming
    }
}

/// A directed, weighted edge. `source == dest` is a self-loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub id: BranchId,
    pub source: NodeId,
    pub dest: NodeId,
    pub weight: Expr,
}

impl Branch {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.dest
    }
}

/// Mutable signal-flow graph.
///
/// Nodes and branches live in slot vectors indexed by their IDs. Slots of
/// destroyed entities stay empty, so IDs are never handed out twice and
/// iteration follows creation order.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) branches: Vec<Option<Branch>>,
    pub(crate) node_count: usize,
    pub(crate) branch_count: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an isolated node.
    pub fn create_node(&mut self, name: impl Into<String>) -> GraphResult<NodeId> {
        self.nodes
            .try_reserve(1)
            .map_err(|_| GraphError::OutOfMemory { what: "node registry" })?;
        let id = NodeId::from_index(self.nodes.len() as u32);
        let name = name.into();
        trace!(node = %id, name = %name, "create node");
        self.nodes.push(Some(Node {
            id,
            name,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }));
        self.node_count += 1;
        Ok(id)
    }

    /// Remove a node together with every branch touching it.
    pub fn destroy_node(&mut self, id: NodeId) -> GraphResult<Node> {
        let node = self.node(id).ok_or(GraphError::NodeNotFound { node: id })?;
        let mut incident: Vec<BranchId> = node.outgoing.clone();
        incident.extend(node.incoming.iter().copied().filter(|b| !node.outgoing.contains(b)));

        for branch in incident {
            self.destroy_branch(branch)?;
        }

        let node = self.nodes[id.slot()]
            .take()
            .ok_or(GraphError::NodeNotFound { node: id })?;
        self.node_count -= 1;
        trace!(node = %id, "destroy node");
        Ok(node)
    }

    /// Add a branch `source -> dest`. A missing weight means unit gain.
    pub fn connect(
        &mut self,
        source: NodeId,
        dest: NodeId,
        weight: Option<Expr>,
    ) -> GraphResult<BranchId> {
        self.node(source)
            .ok_or(GraphError::NodeNotFound { node: source })?;
        self.node(dest).ok_or(GraphError::NodeNotFound { node: dest })?;

        let oom = |_| GraphError::OutOfMemory {
            what: "branch registry",
        };
        self.branches.try_reserve(1).map_err(oom)?;
        self.node_mut(source)?.outgoing.try_reserve(1).map_err(oom)?;
        self.node_mut(dest)?.incoming.try_reserve(1).map_err(oom)?;

        let id = BranchId::from_index(self.branches.len() as u32);
        self.branches.push(Some(Branch {
            id,
            source,
            dest,
            weight: weight.unwrap_or_else(|| Expr::literal(1.0)),
        }));
        self.branch_count += 1;
        self.node_mut(source)?.outgoing.push(id);
        self.node_mut(dest)?.incoming.push(id);
        trace!(branch = %id, source = %source, dest = %dest, "connect");
        Ok(id)
    }

    /// Remove a branch from the graph and from both endpoints.
    pub fn destroy_branch(&mut self, id: BranchId) -> GraphResult<Branch> {
        let branch = self
            .branches
            .get_mut(id.slot())
            .and_then(Option::take)
            .ok_or(GraphError::BranchNotFound { branch: id })?;
        self.branch_count -= 1;

        let source = self.node_mut(branch.source)?;
        source.outgoing.retain(|&b| b != id);
        let dest = self.node_mut(branch.dest)?;
        dest.incoming.retain(|&b| b != id);
        trace!(branch = %id, "destroy branch");
        Ok(branch)
    }

    /// Replace a branch weight, returning the previous one.
    pub fn set_weight(&mut self, id: BranchId, weight: Expr) -> GraphResult<Expr> {
        let branch = self
            .branches
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(GraphError::BranchNotFound { branch: id })?;
        Ok(std::mem::replace(&mut branch.weight, weight))
    }

    pub fn rename_node(&mut self, id: NodeId, name: impl Into<String>) -> GraphResult<()> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    /// First node, in creation order, carrying `name`.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes().find(|n| n.name == name).map(|n| n.id)
    }

    /// Get a node by ID (None if destroyed or never created).
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.slot()).and_then(Option::as_ref)
    }

    /// Get a branch by ID (None if destroyed or never created).
    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.slot()).and_then(Option::as_ref)
    }

    /// Live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    /// Live branches in creation order.
    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().flatten()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn branch_count(&self) -> usize {
        self.branch_count
    }

    /// Outgoing branches of a node; empty for an unknown node.
    pub fn outgoing(&self, id: NodeId) -> &[BranchId] {
        self.node(id).map(Node::outgoing).unwrap_or(&[])
    }

    /// Incoming branches of a node; empty for an unknown node.
    pub fn incoming(&self, id: NodeId) -> &[BranchId] {
        self.node(id).map(Node::incoming).unwrap_or(&[])
    }

    /// Cross-check the node and branch registries against each other.
    pub fn check_consistency(&self) -> GraphResult<()> {
        validate::validate_registrations(self)
    }

    /// Graphviz rendering with node names and weights as labels.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph sfg {\n");
        for node in self.nodes() {
            let _ = writeln!(out, "  N{} [label=\"{}\"];", node.id, escape(&node.name));
        }
        for branch in self.branches() {
            let _ = writeln!(
                out,
                "  N{} -> N{} [label=\"{}\"];",
                branch.source,
                branch.dest,
                escape(&branch.weight.to_string())
            );
        }
        out.push_str("}\n");
        out
    }

    fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.nodes
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(GraphError::NodeNotFound { node: id })
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
