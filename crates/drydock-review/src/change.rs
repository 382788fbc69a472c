//! Per-change capabilities consumed by the pool.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use drydock_core::ChangeId;

use crate::client::ReviewClient;
use crate::error::ReviewError;

/// Error applying a change into a working tree.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The patch does not apply without manual conflict resolution.
    #[error("change does not apply cleanly: {0}")]
    Conflict(String),

    /// The apply exceeded its deadline.
    #[error("apply timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// Repository I/O failed while applying.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error submitting a change through the review system.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The submit exceeded its deadline.
    #[error("submit timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// The review system failed or refused the submit.
    #[error(transparent)]
    Review(#[from] ReviewError),
}

/// A change under review, as handed out by the review system.
///
/// The pool references changes, it never copies them; a change belongs to
/// at most one pool's working set at a time. Apply/submit mechanics and the
/// notification calls back to the review system live with the change
/// itself — the pool only sequences them.
#[async_trait]
pub trait Change: std::fmt::Debug + Send + Sync {
    /// Stable identity used for pool membership and set-difference removal.
    fn id(&self) -> &ChangeId;

    /// Human-followable link to the change, for log lines.
    fn url(&self) -> &str;

    /// Apply this change into `dir`. When `trivial` is set the apply must
    /// be non-interactive and fail on any conflict instead of prompting or
    /// merging.
    async fn apply(&self, dir: &Path, trivial: bool) -> Result<(), ApplyError>;

    /// Submit this change through `client`. A dry run must not perform the
    /// real mutating call.
    async fn submit(&self, client: &dyn ReviewClient, dryrun: bool) -> Result<(), SubmitError>;

    /// Tell the review system this change could not be applied cleanly.
    async fn report_could_not_apply(&self, client: &dyn ReviewClient, dryrun: bool);

    /// Tell the review system this change could not be submitted.
    async fn report_could_not_submit(&self, client: &dyn ReviewClient, dryrun: bool);

    /// Tell the review system this change could not be verified by the
    /// pool build, so it does not re-enter the next pool automatically.
    async fn report_could_not_verify(&self, client: &dyn ReviewClient, dryrun: bool);
}
