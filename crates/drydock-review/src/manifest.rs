//! Pool snapshot manifests.
//!
//! A snapshot records which changes an acquired pool held, as
//! (project, change number, commit) triples in pool order, so the pool can
//! be reconstructed later without a fresh readiness query.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use drydock_core::{ChangeId, PoolFingerprint};

use crate::error::ReviewResult;

/// One pending change recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Project (repository path) the change belongs to.
    pub project: String,

    /// Review-system change number.
    pub change_number: String,

    /// Commit reference the change was fetched at.
    pub commit: String,
}

impl PendingEntry {
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

    /// The change identity this entry records.
    pub fn change_id(&self) -> ChangeId {
        ChangeId::new(
            self.project.clone(),
            self.change_number.clone(),
            self.commit.clone(),
        )
    }
}

impl From<&ChangeId> for PendingEntry {
    fn from(id: &ChangeId) -> Self {
        PendingEntry::new(id.project.clone(), id.change_number.clone(), id.commit.clone())
    }
}

/// A serialized pool capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// When the pool was captured.
    pub captured_at: DateTime<Utc>,

    /// Branch the pool was acquired for.
    pub branch: String,

    /// Pending changes in pool order.
    pub entries: Vec<PendingEntry>,
}

impl PoolSnapshot {
    /// Create a snapshot captured now.
    pub fn new(branch: impl Into<String>, entries: Vec<PendingEntry>) -> Self {
        Self {
            captured_at: Utc::now(),
            branch: branch.into(),
            entries,
        }
    }

    /// Fingerprint over the recorded change identities, in order.
    pub fn fingerprint(&self) -> PoolFingerprint {
        let ids: Vec<ChangeId> = self.entries.iter().map(|e| e.change_id()).collect();
        PoolFingerprint::of_changes(ids.iter())
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> ReviewResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write the snapshot to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> ReviewResult<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
