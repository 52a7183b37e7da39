//! sfg-core: shared foundation for the signal-flow-graph solver.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact handles for graph and expression arena objects)
//! - error (shared error type every crate error converts into)

pub mod error;
pub mod ids;
pub mod numeric;

pub use error::{SfgError, SfgResult};
pub use ids::*;
pub use numeric::*;
