//! sfg-expr: symbolic expressions for signal-flow-graph gains.
//!
//! Provides:
//! - An arena-backed expression tree with parent handles ([`Expr`], [`Node`])
//! - A parser with implicit multiplication and `exp(x)` support ([`parse`])
//! - Simplification passes: constant folding, chain normalization and
//!   common-term collection ([`simplify`])
//! - Numeric evaluation against a [`SubsTable`]
//!
//! # Example
//!
//! ```
//! use sfg_expr::{SimplifyConfig, SubsTable, parse, simplify};
//!
//! let mut expr = parse("2a + b + 3a").unwrap();
//! simplify(&mut expr, &SimplifyConfig::default());
//! assert_eq!(expr.to_string(), "5*a + b");
//!
//! let subs: SubsTable = [("a", 1.0), ("b", 2.0)].into_iter().collect();
//! assert_eq!(expr.evaluate(&subs).unwrap(), 7.0);
//! ```

pub mod display;
pub mod error;
pub mod eval;
pub mod parser;
pub mod simplify;
pub mod tree;

pub use error::{ExprError, ExprResult, ParseError, ParseErrorKind};
pub use eval::{Binding, SubsTable, evaluate};
pub use parser::parse;
pub use simplify::{
    SimplifyConfig, SimplifyReport, collect_common_terms, eliminate_divisions_and_subtractions,
    eliminate_identities, fold_constants, normalize_chains, simplify,
};
pub use tree::{BinaryOp, Expr, Node, UnaryOp};
