//! Graph-specific error types.

use sfg_core::{BranchId, NodeId, SfgError};
use sfg_expr::ExprError;

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction, mutation and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The node is not a member of this graph.
    NodeNotFound { node: NodeId },

    /// The branch is not a member of this graph.
    BranchNotFound { branch: BranchId },

    /// Two nodes were given the same name in a builder.
    DuplicateNodeName { name: String },

    /// A builder branch refers to a node name that was never added.
    UnknownNodeName { name: String },

    /// A branch is missing from, or misfiled in, one of its three registries.
    InconsistentAdjacency { branch: BranchId, node: NodeId },

    /// ID not found in index map.
    IdNotFound { what: &'static str },

    /// Growing a registry failed.
    OutOfMemory { what: &'static str },

    /// A textual branch weight did not parse.
    Weight { source: String, err: ExprError },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::NodeNotFound { node } => {
                write!(f, "Node {} is not part of this graph", node)
            }
            GraphError::BranchNotFound { branch } => {
                write!(f, "Branch {} is not part of this graph", branch)
            }
            GraphError::DuplicateNodeName { name } => {
                write!(f, "Node name '{}' is used more than once", name)
            }
            GraphError::UnknownNodeName { name } => {
                write!(f, "No node named '{}'", name)
            }
            GraphError::InconsistentAdjacency { branch, node } => {
                write!(
                    f,
                    "Branch {} is not registered consistently with node {}",
                    branch, node
                )
            }
            GraphError::IdNotFound { what } => {
                write!(f, "{} not found in index map", what)
            }
            GraphError::OutOfMemory { what } => {
                write!(f, "Out of memory while growing {}", what)
            }
            GraphError::Weight { source, err } => {
                write!(f, "Invalid weight '{}': {}", source, err)
            }
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Weight { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl From<GraphError> for SfgError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NodeNotFound { .. }
            | GraphError::BranchNotFound { .. }
            | GraphError::UnknownNodeName { .. }
            | GraphError::IdNotFound { .. } => SfgError::NotFound {
                what: err.to_string(),
            },
            GraphError::OutOfMemory { what } => SfgError::OutOfMemory { what },
            GraphError::InconsistentAdjacency { .. } => SfgError::Invariant {
                what: err.to_string(),
            },
            GraphError::DuplicateNodeName { .. } | GraphError::Weight { .. } => {
                SfgError::InvalidArg {
                    what: err.to_string(),
                }
            }
        }
    }
}
