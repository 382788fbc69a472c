//! Pool configuration.

use serde::{Deserialize, Serialize};

/// Process-level pool configuration.
///
/// The effective dry-run flag for a pool is computed once at construction
/// as `instance flag OR force_dryrun`; nothing reads process state
/// mid-operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolConfig {
    /// Force every pool into dry-run regardless of its own flag. Operator
    /// escape hatch for staging deployments.
    pub force_dryrun: bool,

    /// Wall-clock limit for a single apply or submit call, in seconds.
    /// 0 means unbounded.
    pub change_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            force_dryrun: false,
            change_timeout_secs: 0,
        }
    }
}

impl PoolConfig {
    /// Create a config from environment variables.
    ///
    /// `DRYDOCK_FORCE_DRYRUN=1` (or `true`) forces dry-run everywhere.
    pub fn from_env() -> Self {
        let force_dryrun = std::env::var("DRYDOCK_FORCE_DRYRUN")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self {
            force_dryrun,
            ..Self::default()
        }
    }

    /// The dry-run flag a pool constructed with `instance` should run with.
    pub fn effective_dryrun(&self, instance: bool) -> bool {
        instance || self.force_dryrun
    }
}
