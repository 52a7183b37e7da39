//! Name-based graph builder.

use sfg_core::NodeId;
use sfg_expr::parse;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

#[derive(Debug, Clone)]
struct PendingBranch {
    source: String,
    dest: String,
    weight: Option<String>,
}

/// Builder for constructing a graph from node names and weight text.
///
/// Nothing is checked until [`build`](GraphBuilder::build): duplicate names,
/// unknown endpoints and weights that do not parse are all reported there.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    names: Vec<String>,
    branches: Vec<PendingBranch>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return the ID it will have in the built graph.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId::from_index(self.names.len() as u32);
        self.names.push(name.into());
        id
    }

    /// ID of the node called `name`, adding it first if needed.
    pub fn ensure_node(&mut self, name: &str) -> NodeId {
        match self.names.iter().position(|n| n == name) {
            Some(i) => NodeId::from_index(i as u32),
            None => self.add_node(name),
        }
    }

    /// Record a branch between two named nodes. `weight` is expression text;
    /// `None` means unit gain.
    pub fn connect(&mut self, source: &str, dest: &str, weight: Option<&str>) -> &mut Self {
        self.branches.push(PendingBranch {
            source: source.to_string(),
            dest: dest.to_string(),
            weight: weight.map(str::to_string),
        });
        self
    }

    /// Rename a node (useful for post-construction adjustments).
    pub fn rename_node(&mut self, node_id: NodeId, new_name: impl Into<String>) {
        if let Some(name) = self.names.get_mut(node_id.slot()) {
            *name = new_name.into();
        }
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Validate names, parse weights and produce the graph.
    pub fn build(self) -> GraphResult<Graph> {
        for (i, name) in self.names.iter().enumerate() {
            if self.names[..i].contains(name) {
                return Err(GraphError::DuplicateNodeName { name: name.clone() });
            }
        }

        let mut graph = Graph::new();
        for name in &self.names {
            graph.create_node(name.as_str())?;
        }

        let lookup = |name: &str| {
            self.names
                .iter()
                .position(|n| n == name)
                .map(|i| NodeId::from_index(i as u32))
                .ok_or_else(|| GraphError::UnknownNodeName {
                    name: name.to_string(),
                })
        };

        for pending in &self.branches {
            let source = lookup(&pending.source)?;
            let dest = lookup(&pending.dest)?;
            let weight = match &pending.weight {
                Some(text) => Some(parse(text).map_err(|err| GraphError::Weight {
                    source: text.clone(),
                    err,
                })?),
                None => None,
            };
            graph.connect(source, dest, weight)?;
        }

        graph.check_consistency()?;
        Ok(graph)
    }
}
