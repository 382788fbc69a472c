//! Pool error taxonomy.

use thiserror::Error;

use drydock_review::ReviewError;

/// Errors from pool lifecycle operations.
///
/// `TreeClosed` means "nothing happened": the tree was not in a go state
/// and no mutation was performed. It is an expected operating condition,
/// not a bug, and callers branch on it explicitly via
/// [`PoolError::is_tree_closed`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// The tree is not open or throttled.
    #[error("tree is closed, set it to open or throttled to proceed")]
    TreeClosed,

    /// The review system failed during acquisition.
    #[error("review error: {0}")]
    Review(#[from] ReviewError),
}

impl PoolError {
    /// Whether this is the expected tree-closed condition rather than a
    /// failure.
    pub fn is_tree_closed(&self) -> bool {
        matches!(self, PoolError::TreeClosed)
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = std::result::Result<T, PoolError>;
