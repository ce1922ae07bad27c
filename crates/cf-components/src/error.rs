//! Error types for stage map and chain operations.

use thiserror::Error;

/// Errors that can occur while building or querying stage maps and chains.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Insufficient samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("Singular fit: {what}")]
    SingularFit { what: &'static str },

    #[error("Invalid sample #{index}: {what}")]
    InvalidSample { index: usize, what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Stage count mismatch for {what}: expected {expected}, got {got}")]
    StageCountMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Index out of range for {what}: {index} (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Stage chain has no stages")]
    EmptyChain,
}

pub type ComponentResult<T> = Result<T, ComponentError>;
