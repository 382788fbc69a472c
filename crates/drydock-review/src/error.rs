//! Error types for review-system interactions.

use thiserror::Error;

/// Errors from the review-system client.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The review system could not be reached.
    #[error("review transport failed: {0}")]
    Transport(String),

    /// The requested change does not exist at the given commit.
    #[error("change not found: {project}/{change_number}")]
    ChangeNotFound {
        project: String,
        change_number: String,
    },

    /// The review system refused a call (permissions, stale vote, ...).
    #[error("review call rejected: {0}")]
    Rejected(String),

    /// A snapshot or payload failed to decode.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for review-system operations.
pub type ReviewResult<T> = std::result::Result<T, ReviewError>;
