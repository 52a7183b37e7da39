use thiserror::Error;

pub type SfgResult<T> = Result<T, SfgError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SfgError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Out of memory while growing {what}")]
    OutOfMemory { what: &'static str },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
