//! Change identity and lifecycle status.

use serde::{Deserialize, Serialize};

/// Stable identity of a change under review.
///
/// A change is identified by the project it touches, its review-system
/// change number, and the commit it was fetched at. All three are immutable
/// once fetched; the tuple is hashable so pools can do duplicates-safe
/// set-difference removal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeId {
    /// Project (repository path) the change belongs to.
    pub project: String,

    /// Review-system change number.
    pub change_number: String,

    /// Commit reference the change was fetched at.
    pub commit: String,
}

impl ChangeId {
    pub fn new(
        project: impl Into<String>,
        change_number: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            change_number: change_number.into(),
            commit: commit.into(),
        }
    }

    /// Short form of the commit reference (first 12 chars).
    pub fn short_commit(&self) -> &str {
        &self.commit[..12.min(self.commit.len())]
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.project,
            self.change_number,
            self.short_commit()
        )
    }
}

/// Lifecycle status of a change within one pool run.
///
/// The status is explicit rather than inferred from which handler was last
/// invoked. Legal transitions:
/// - `Pending → Applied | ApplyFailed`
/// - `Pending | Applied → Submitted | SubmitFailed` (a pool reconstructed
///   from a snapshot submits changes that were never applied in this
///   process)
/// - any non-terminal status → `ValidationFailed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// In the pool, not yet touched by any phase.
    Pending,
    /// Applied cleanly into the working tree.
    Applied,
    /// Did not apply; evicted from the pool for this run.
    ApplyFailed,
    /// Submitted through the review system.
    Submitted,
    /// Submit was attempted and failed.
    SubmitFailed,
    /// The pool build could not be verified.
    ValidationFailed,
}

impl ChangeStatus {
    /// Whether moving to `next` is a legal lifecycle transition.
    pub fn can_transition(self, next: ChangeStatus) -> bool {
        use ChangeStatus::*;
        matches!(
            (self, next),
            (Pending, Applied)
                | (Pending, ApplyFailed)
                | (Pending | Applied, Submitted)
                | (Pending | Applied, SubmitFailed)
                | (Pending | Applied | Submitted | SubmitFailed, ValidationFailed)
        )
    }

    /// Whether this status marks a failure outcome.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ChangeStatus::ApplyFailed | ChangeStatus::SubmitFailed | ChangeStatus::ValidationFailed
        )
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeStatus::Pending => "pending",
            ChangeStatus::Applied => "applied",
            ChangeStatus::ApplyFailed => "apply_failed",
            ChangeStatus::Submitted => "submitted",
            ChangeStatus::SubmitFailed => "submit_failed",
            ChangeStatus::ValidationFailed => "validation_failed",
        };
        write!(f, "{}", s)
    }
}
