//! Validation pool lifecycle.
//!
//! A [`ValidationPool`] is the working set of changes for one merge-queue
//! cycle: acquired under an open tree, applied into a working directory
//! with partial-failure isolation, and submitted under a re-checked tree.
//! Failures are classified per change — apply failures evict the change,
//! submit failures are reported and skipped, validation failures notify
//! the whole pool.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use drydock_core::{ChangeId, ChangeStatus, PoolFingerprint};
use drydock_review::{
    filter_to_workspace, ApplyError, Change, PendingEntry, PoolSnapshot, ReviewClient, SubmitError,
};

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::gate::TreeGate;

/// One change tracked by the pool, with its explicit lifecycle status.
#[derive(Clone)]
pub struct PoolEntry {
    /// The change itself (referenced, never copied).
    pub change: Arc<dyn Change>,

    /// Where the change is in the pool lifecycle.
    pub status: ChangeStatus,
}

/// The working set of changes for one merge-queue cycle.
///
/// Created only through [`ValidationPool::acquire`] or
/// [`ValidationPool::acquire_from_snapshot`]; a pool instance belongs to
/// exactly one logical workflow run.
pub struct ValidationPool {
    id: Uuid,
    branch: String,
    entries: Vec<PoolEntry>,
    evicted: Vec<PoolEntry>,
    client: Arc<dyn ReviewClient>,
    dryrun: bool,
    change_timeout_secs: u64,
}

impl std::fmt::Debug for ValidationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPool")
            .field("id", &self.id)
            .field("branch", &self.branch)
            .field("entries", &self.entries.len())
            .field("evicted", &self.evicted.len())
            .field("dryrun", &self.dryrun)
            .field("change_timeout_secs", &self.change_timeout_secs)
            .finish()
    }
}

impl ValidationPool {
    /// Acquire the current pool from the review system.
    ///
    /// Checks the tree gate first: a closed tree yields
    /// [`PoolError::TreeClosed`] before any review-system call, so no
    /// partial state is created. Otherwise the ready changes for `branch`
    /// are fetched and filtered to projects present under
    /// `workspace_root`.
    pub async fn acquire(
        gate: &TreeGate,
        client: Arc<dyn ReviewClient>,
        branch: &str,
        workspace_root: &Path,
        dryrun: bool,
        config: &PoolConfig,
    ) -> PoolResult<Self> {
        if !gate.is_open().await {
            return Err(PoolError::TreeClosed);
        }

        let raw = client.list_ready_changes(branch).await?;
        let candidates = raw.len();
        let changes = filter_to_workspace(raw, workspace_root);

        let pool = Self::assemble(branch, changes, client, dryrun, config);
        info!(
            pool = %pool.id,
            fingerprint = %pool.fingerprint().short(),
            branch,
            candidates,
            kept = pool.len(),
            "acquired validation pool"
        );
        Ok(pool)
    }

    /// Reconstruct a previously acquired pool from a snapshot.
    ///
    /// No gate check: a snapshot records a pool that was already approved
    /// for testing; replaying it does not decide freshly whether the tree
    /// may be mutated.
    pub async fn acquire_from_snapshot(
        snapshot: &PoolSnapshot,
        client: Arc<dyn ReviewClient>,
        dryrun: bool,
        config: &PoolConfig,
    ) -> PoolResult<Self> {
        let mut changes = Vec::with_capacity(snapshot.entries.len());
        for entry in &snapshot.entries {
            let change = client
                .fetch_change(&entry.project, &entry.change_number, &entry.commit)
                .await?;
            changes.push(change);
        }

        let pool = Self::assemble(&snapshot.branch, changes, client, dryrun, config);
        info!(
            pool = %pool.id,
            fingerprint = %pool.fingerprint().short(),
            branch = %snapshot.branch,
            entries = pool.len(),
            "reconstructed pool from snapshot"
        );
        Ok(pool)
    }

    fn assemble(
        branch: &str,
        changes: Vec<Arc<dyn Change>>,
        client: Arc<dyn ReviewClient>,
        dryrun: bool,
        config: &PoolConfig,
    ) -> Self {
        // Unique by identity, first occurrence wins; insertion order is
        // fetch order.
        let mut seen = HashSet::new();
        let entries = changes
            .into_iter()
            .filter(|change| seen.insert(change.id().clone()))
            .map(|change| PoolEntry {
                change,
                status: ChangeStatus::Pending,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            branch: branch.to_string(),
            entries,
            evicted: Vec::new(),
            client,
            // Fixed once at construction; nothing reads process state
            // mid-operation.
            dryrun: config.effective_dryrun(dryrun),
            change_timeout_secs: config.change_timeout_secs,
        }
    }

    /// Pool identifier for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Branch this pool was acquired for.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Whether this pool suppresses mutating review calls.
    pub fn dryrun(&self) -> bool {
        self.dryrun
    }

    /// Number of changes currently in the working set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the working set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Changes currently in the working set, in pool order.
    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    /// Changes evicted for apply failure. Never retried within this pool's
    /// lifetime.
    pub fn evicted(&self) -> &[PoolEntry] {
        &self.evicted
    }

    /// Fingerprint over the current working set, in order.
    pub fn fingerprint(&self) -> PoolFingerprint {
        let ids: Vec<ChangeId> = self.entries.iter().map(|e| e.change.id().clone()).collect();
        PoolFingerprint::of_changes(ids.iter())
    }

    /// Capture the current working set as a snapshot.
    pub fn to_snapshot(&self) -> PoolSnapshot {
        let entries = self
            .entries
            .iter()
            .map(|e| PendingEntry::from(e.change.id()))
            .collect();
        PoolSnapshot::new(self.branch.clone(), entries)
    }

    /// Apply every change in the pool into `dir` with a trivial
    /// (conflict-intolerant) apply.
    ///
    /// Every change gets its own attempt regardless of earlier failures —
    /// one bad change never blocks unrelated changes. Changes that fail
    /// are reported through the could-not-apply path and evicted from the
    /// working set by identity. Returns whether at least one change
    /// remains applied.
    pub async fn apply_into_repo(&mut self, dir: &Path) -> bool {
        let timeout_secs = self.change_timeout_secs;
        let mut failed: Vec<Arc<dyn Change>> = Vec::new();

        for entry in &mut self.entries {
            let change = entry.change.clone();
            match apply_with_deadline(change.as_ref(), dir, timeout_secs).await {
                Ok(()) => {
                    debug_assert!(entry.status.can_transition(ChangeStatus::Applied));
                    entry.status = ChangeStatus::Applied;
                    info!(change = %change.id(), url = change.url(), "applied change");
                }
                Err(err) => {
                    debug_assert!(entry.status.can_transition(ChangeStatus::ApplyFailed));
                    entry.status = ChangeStatus::ApplyFailed;
                    warn!(change = %change.id(), error = %err, "change did not apply cleanly");
                    failed.push(change);
                }
            }
        }

        if !failed.is_empty() {
            debug!(count = failed.len(), "some changes could not be applied cleanly");
            self.handle_application_failure(&failed).await;

            let failed_ids: HashSet<ChangeId> =
                failed.iter().map(|c| c.id().clone()).collect();
            let (evicted, kept): (Vec<_>, Vec<_>) = self
                .entries
                .drain(..)
                .partition(|e| failed_ids.contains(e.change.id()));
            self.entries = kept;
            self.evicted.extend(evicted);
        }

        !self.entries.is_empty()
    }

    /// Submit every remaining change through the bound review client.
    ///
    /// The gate is re-checked at call time: apply and validation take real
    /// wall-clock time and the tree may have closed since acquisition. A
    /// closed tree yields [`PoolError::TreeClosed`] with zero submit
    /// calls. Submit failures are per-change — they are routed to the
    /// could-not-submit path and do not abort the remaining submits; the
    /// whole pool is always iterated before returning. Returns `Ok(true)`
    /// once the pool was iterated under an open tree; individual outcomes
    /// surface via entry statuses and the per-change notifications.
    pub async fn submit(&mut self, gate: &TreeGate) -> PoolResult<bool> {
        if !gate.is_open().await {
            return Err(PoolError::TreeClosed);
        }

        let client = self.client.clone();
        let dryrun = self.dryrun;
        let timeout_secs = self.change_timeout_secs;

        for entry in &mut self.entries {
            let change = entry.change.clone();
            info!(change = %change.id(), dryrun, "submitting change");
            match submit_with_deadline(change.as_ref(), client.as_ref(), dryrun, timeout_secs)
                .await
            {
                Ok(()) => {
                    debug_assert!(entry.status.can_transition(ChangeStatus::Submitted));
                    entry.status = ChangeStatus::Submitted;
                }
                Err(err) => {
                    debug_assert!(entry.status.can_transition(ChangeStatus::SubmitFailed));
                    entry.status = ChangeStatus::SubmitFailed;
                    warn!(change = %change.id(), error = %err, "could not submit change");
                    change.report_could_not_submit(client.as_ref(), dryrun).await;
                }
            }
        }

        Ok(true)
    }

    /// Route apply failures back to the review system, one notification
    /// per change.
    pub async fn handle_application_failure(&self, failed: &[Arc<dyn Change>]) {
        for change in failed {
            info!(change = %change.id(), "notifying review system: could not apply");
            change
                .report_could_not_apply(self.client.as_ref(), self.dryrun)
                .await;
        }
    }

    /// Tell the review system the pool build could not be verified.
    ///
    /// Every change currently in the pool is notified, regardless of its
    /// apply/submit history, so none of them re-enter the next pool
    /// automatically.
    pub async fn handle_validation_failure(&mut self) {
        warn!(pool = %self.id, changes = self.entries.len(), "validation failed for pool");

        let client = self.client.clone();
        let dryrun = self.dryrun;
        for entry in &mut self.entries {
            info!(change = %entry.change.id(), "notifying review system: could not verify");
            entry
                .change
                .report_could_not_verify(client.as_ref(), dryrun)
                .await;
            debug_assert!(entry.status.can_transition(ChangeStatus::ValidationFailed));
            entry.status = ChangeStatus::ValidationFailed;
        }
    }
}

async fn apply_with_deadline(
    change: &dyn Change,
    dir: &Path,
    timeout_secs: u64,
) -> Result<(), ApplyError> {
    if timeout_secs == 0 {
        return change.apply(dir, true).await;
    }
    match tokio::time::timeout(Duration::from_secs(timeout_secs), change.apply(dir, true)).await {
        Ok(result) => result,
        Err(_) => Err(ApplyError::TimedOut { secs: timeout_secs }),
    }
}

async fn submit_with_deadline(
    change: &dyn Change,
    client: &dyn ReviewClient,
    dryrun: bool,
    timeout_secs: u64,
) -> Result<(), SubmitError> {
    if timeout_secs == 0 {
        return change.submit(client, dryrun).await;
    }
    match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        change.submit(client, dryrun),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(SubmitError::TimedOut { secs: timeout_secs }),
    }
}
