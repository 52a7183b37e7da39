//! sfg-graph: signal-flow graph model and traversal.
//!
//! Provides:
//! - Graph data structures (Node, Branch, Graph) with symbolic branch weights
//! - A name-based builder with validation
//! - Dense node indexing for traversal state
//! - Forward path and elementary loop enumeration
//!
//! # Example
//!
//! ```
//! use sfg_graph::{GraphBuilder, find_forward_paths, find_loops};
//!
//! let mut builder = GraphBuilder::new();
//! let u = builder.add_node("u");
//! let y = builder.add_node("y");
//! builder.connect("u", "y", Some("G"));
//! builder.connect("y", "y", Some("H"));
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(find_forward_paths(&graph, u, y).unwrap().len(), 1);
//! assert_eq!(find_loops(&graph).unwrap().len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod indexing;
pub mod path;
pub mod traverse;
pub(crate) mod validate;

pub use builder::GraphBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{Branch, Graph, Node};
pub use indexing::IndexMap;
pub use path::{Path, PathList};
pub use traverse::{find_forward_paths, find_loops};
