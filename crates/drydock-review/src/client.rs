//! Review-system client capability.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use drydock_core::ChangeId;

use crate::change::Change;
use crate::error::ReviewResult;

/// Narrow interface to the code-review system.
///
/// Listing and fetching hand out [`Change`] objects in review-system order.
/// `submit_change` is the mutating call a dry run suppresses;
/// `post_review` is advisory and may fire even under dry run.
#[async_trait]
pub trait ReviewClient: Send + Sync {
    /// List the changes marked ready for the merge queue on `branch`.
    async fn list_ready_changes(&self, branch: &str) -> ReviewResult<Vec<Arc<dyn Change>>>;

    /// Fetch a single change at a known commit.
    async fn fetch_change(
        &self,
        project: &str,
        change_number: &str,
        commit: &str,
    ) -> ReviewResult<Arc<dyn Change>>;

    /// Perform the real submit call for `id`.
    async fn submit_change(&self, id: &ChangeId) -> ReviewResult<()>;

    /// Leave a review message on `id`, optionally clearing its ready vote.
    async fn post_review(&self, id: &ChangeId, message: &str, clear_ready: bool)
        -> ReviewResult<()>;
}

/// Drop changes whose project does not exist under `root`.
///
/// A change belongs in the workspace when `root/<project>` is a directory.
/// Keeps the incoming order.
pub fn filter_to_workspace(changes: Vec<Arc<dyn Change>>, root: &Path) -> Vec<Arc<dyn Change>> {
    changes
        .into_iter()
        .filter(|change| {
            let present = root.join(&change.id().project).is_dir();
            if !present {
                debug!(change = %change.id(), "project not in workspace, dropping");
            }
            present
        })
        .collect()
}
