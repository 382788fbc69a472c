//! Drydock Core - shared domain types for the validation pool.
//!
//! The validation pool is the set of review changes a merge queue considers
//! ready to test and land together. This crate holds the vocabulary the
//! lifecycle crates share:
//! - change identity and explicit lifecycle status
//! - tree health status as reported by the status endpoint
//! - deterministic pool fingerprints for log correlation
//! - tracing initialisation for binaries

pub mod change;
pub mod fingerprint;
pub mod telemetry;
pub mod tree;

pub use change::{ChangeId, ChangeStatus};
pub use fingerprint::PoolFingerprint;
pub use telemetry::init_tracing;
pub use tree::TreeStatus;

/// Drydock version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
