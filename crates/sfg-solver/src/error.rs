//! Error types for solver operations.

use sfg_core::SfgError;
use sfg_graph::GraphError;
use thiserror::Error;

/// Errors that can occur while solving a graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Graph has {nodes} nodes, more than the configured maximum of {max}")]
    GraphTooLarge { nodes: usize, max: usize },

    #[error("Not found: {what}")]
    NotFound { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for SfgError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Graph(err) => err.into(),
            SolverError::GraphTooLarge { .. } => SfgError::InvalidArg {
                what: e.to_string(),
            },
            SolverError::NotFound { what } => SfgError::NotFound { what },
        }
    }
}
