//! Error types for Cutline.

use thiserror::Error;

/// Main error type for Cutline operations.
///
/// Most timeline control flow is deliberately not error-shaped: redundant
/// removals return `None` and boundary cuts return a no-op outcome value.
/// The variants here are the conditions that must not be swallowed.
#[derive(Error, Debug)]
pub enum CutlineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeline error: {0}")]
    Timeline(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No compositor with destroy id {0}")]
    CompositorNotFound(u64),

    #[error("Track index {0} out of range")]
    TrackOutOfRange(usize),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Cutline operations.
pub type Result<T> = std::result::Result<T, CutlineError>;
