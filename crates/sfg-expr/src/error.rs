//! Error types for parsing, tree surgery and evaluation.

use sfg_core::SfgError;
use thiserror::Error;

/// What went wrong while reading expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedChar(char),
    UnexpectedToken,
    UnexpectedEnd,
    UnbalancedParen,
    InvalidNumber,
}

/// Malformed source text. `offset` is a byte offset into the input.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("parse error at offset {offset}: {kind:?}")]
pub struct ParseError {
    pub offset: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(offset: usize, kind: ParseErrorKind) -> Self {
        Self { offset, kind }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Malformed function call: {reason}")]
    MalformedFunctionCall { reason: &'static str },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Cyclic binding while resolving variable: {name}")]
    CyclicBinding { name: String },

    #[error("Expression contains an argument list and cannot be evaluated")]
    NotEvaluable,

    #[error("Node has no parent")]
    NoParent,

    #[error("Parent has a fixed number of operands")]
    FixedArityParent,

    #[error("Invalid expression node: {what}")]
    InvalidNode { what: String },

    #[error("Out of memory while growing {what}")]
    OutOfMemory { what: &'static str },
}

pub type ExprResult<T> = Result<T, ExprError>;

impl From<ExprError> for SfgError {
    fn from(err: ExprError) -> Self {
        match err {
            ExprError::UndefinedVariable { name } => SfgError::NotFound {
                what: format!("variable {name}"),
            },
            ExprError::OutOfMemory { what } => SfgError::OutOfMemory { what },
            ExprError::InvalidNode { what } => SfgError::Invariant { what },
            other => SfgError::InvalidArg {
                what: other.to_string(),
            },
        }
    }
}
