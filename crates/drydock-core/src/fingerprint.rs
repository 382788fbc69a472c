//! Deterministic pool identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::change::ChangeId;

/// SHA-256 fingerprint over an ordered sequence of change identities.
///
/// Two pools holding the same changes in the same order produce the same
/// fingerprint, which makes log lines and snapshot reports correlatable
/// across processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolFingerprint(String);

impl PoolFingerprint {
    /// Compute the fingerprint of an ordered sequence of change identities.
    pub fn of_changes<'a>(ids: impl IntoIterator<Item = &'a ChangeId>) -> Self {
        let mut hasher = Sha256::new();
        for id in ids {
            hasher.update(id.project.as_bytes());
            hasher.update(b"\0");
            hasher.update(id.change_number.as_bytes());
            hasher.update(b"\0");
            hasher.update(id.commit.as_bytes());
            hasher.update(b"\0");
        }
        PoolFingerprint(hex::encode(hasher.finalize()))
    }

    /// Full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars) for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for PoolFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
