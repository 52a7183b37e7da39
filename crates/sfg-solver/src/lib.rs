//! Symbolic transfer functions for signal-flow graphs.
//!
//! Enumerates forward paths and loops with `sfg-graph`, then combines them
//! with Mason's gain rule into a single [`Expr`](sfg_expr::Expr).

pub mod config;
pub mod error;
pub mod mason;
pub mod solve;

pub use config::SolverConfig;
pub use error::{SolverError, SolverResult};
pub use mason::{MasonResult, determinant};
pub use solve::{solve, solve_detailed, solve_named, solve_with_config};
