//! In-memory fakes for the review traits (testing only)
//!
//! Provides `ScriptedChange` and `MemoryReviewClient` that satisfy the
//! trait contracts without any external review system.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use drydock_core::ChangeId;

use crate::change::{ApplyError, Change, SubmitError};
use crate::client::ReviewClient;
use crate::error::{ReviewError, ReviewResult};

// ---------------------------------------------------------------------------
// ScriptedChange
// ---------------------------------------------------------------------------

/// A change whose apply outcome is fixed up front and whose calls are
/// counted, so tests can assert exactly which handlers fired.
#[derive(Debug)]
pub struct ScriptedChange {
    id: ChangeId,
    url: String,
    fail_apply: bool,
    apply_calls: AtomicU32,
    submit_calls: AtomicU32,
    could_not_apply_calls: AtomicU32,
    could_not_submit_calls: AtomicU32,
    could_not_verify_calls: AtomicU32,
}

impl ScriptedChange {
    /// A change that applies cleanly.
    pub fn new(id: ChangeId) -> Arc<Self> {
        Self::build(id, false)
    }

    /// A change whose apply always conflicts.
    pub fn failing_apply(id: ChangeId) -> Arc<Self> {
        Self::build(id, true)
    }

    fn build(id: ChangeId, fail_apply: bool) -> Arc<Self> {
        let url = format!(
            "https://review.example.com/c/{}/+/{}",
            id.project, id.change_number
        );
        Arc::new(Self {
            id,
            url,
            fail_apply,
            apply_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            could_not_apply_calls: AtomicU32::new(0),
            could_not_submit_calls: AtomicU32::new(0),
            could_not_verify_calls: AtomicU32::new(0),
        })
    }

    pub fn apply_calls(&self) -> u32 {
        self.apply_calls.load(Ordering::Relaxed)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::Relaxed)
    }

    pub fn could_not_apply_calls(&self) -> u32 {
        self.could_not_apply_calls.load(Ordering::Relaxed)
    }

    pub fn could_not_submit_calls(&self) -> u32 {
        self.could_not_submit_calls.load(Ordering::Relaxed)
    }

    pub fn could_not_verify_calls(&self) -> u32 {
        self.could_not_verify_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Change for ScriptedChange {
    fn id(&self) -> &ChangeId {
        &self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn apply(&self, _dir: &Path, _trivial: bool) -> Result<(), ApplyError> {
        self.apply_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_apply {
            Err(ApplyError::Conflict(format!("{} conflicts", self.id)))
        } else {
            Ok(())
        }
    }

    async fn submit(&self, client: &dyn ReviewClient, dryrun: bool) -> Result<(), SubmitError> {
        self.submit_calls.fetch_add(1, Ordering::Relaxed);
        if dryrun {
            return Ok(());
        }
        client.submit_change(&self.id).await?;
        Ok(())
    }

    async fn report_could_not_apply(&self, client: &dyn ReviewClient, dryrun: bool) {
        self.could_not_apply_calls.fetch_add(1, Ordering::Relaxed);
        // Advisory message always fires; the ready vote is only cleared
        // for real runs.
        let _ = client
            .post_review(&self.id, "change could not be applied", !dryrun)
            .await;
    }

    async fn report_could_not_submit(&self, client: &dyn ReviewClient, dryrun: bool) {
        self.could_not_submit_calls.fetch_add(1, Ordering::Relaxed);
        let _ = client
            .post_review(&self.id, "change could not be submitted", !dryrun)
            .await;
    }

    async fn report_could_not_verify(&self, client: &dyn ReviewClient, dryrun: bool) {
        self.could_not_verify_calls.fetch_add(1, Ordering::Relaxed);
        let _ = client
            .post_review(&self.id, "change could not be verified", !dryrun)
            .await;
    }
}

// ---------------------------------------------------------------------------
// MemoryReviewClient
// ---------------------------------------------------------------------------

/// In-memory review client that hands out staged changes and records every
/// mutating or advisory call.
#[derive(Default)]
pub struct MemoryReviewClient {
    changes: Mutex<Vec<Arc<ScriptedChange>>>,
    reject_submit: Mutex<HashSet<ChangeId>>,
    submitted: Mutex<Vec<ChangeId>>,
    reviews: Mutex<Vec<(ChangeId, String)>>,
    list_calls: AtomicU32,
}

impl MemoryReviewClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a change the client hands out from listing and fetching.
    pub fn stage(&self, change: Arc<ScriptedChange>) {
        self.changes.lock().unwrap().push(change);
    }

    /// Make `submit_change` fail for `id`.
    pub fn reject_submit_for(&self, id: ChangeId) {
        self.reject_submit.lock().unwrap().insert(id);
    }

    /// How many times `list_ready_changes` was called.
    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Identities that reached the real submit endpoint, in order.
    pub fn submitted(&self) -> Vec<ChangeId> {
        self.submitted.lock().unwrap().clone()
    }

    /// Review messages posted, in order.
    pub fn reviews(&self) -> Vec<(ChangeId, String)> {
        self.reviews.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewClient for MemoryReviewClient {
    async fn list_ready_changes(&self, _branch: &str) -> ReviewResult<Vec<Arc<dyn Change>>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let changes = self.changes.lock().unwrap();
        Ok(changes
            .iter()
            .map(|c| c.clone() as Arc<dyn Change>)
            .collect())
    }

    async fn fetch_change(
        &self,
        project: &str,
        change_number: &str,
        _commit: &str,
    ) -> ReviewResult<Arc<dyn Change>> {
        let changes = self.changes.lock().unwrap();
        changes
            .iter()
            .find(|c| c.id().project == project && c.id().change_number == change_number)
            .map(|c| c.clone() as Arc<dyn Change>)
            .ok_or_else(|| ReviewError::ChangeNotFound {
                project: project.to_string(),
                change_number: change_number.to_string(),
            })
    }

    async fn submit_change(&self, id: &ChangeId) -> ReviewResult<()> {
        if self.reject_submit.lock().unwrap().contains(id) {
            return Err(ReviewError::Rejected(format!("submit refused for {}", id)));
        }
        self.submitted.lock().unwrap().push(id.clone());
        Ok(())
    }

    async fn post_review(
        &self,
        id: &ChangeId,
        message: &str,
        _clear_ready: bool,
    ) -> ReviewResult<()> {
        self.reviews
            .lock()
            .unwrap()
            .push((id.clone(), message.to_string()));
        Ok(())
    }
}
