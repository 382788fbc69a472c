//! Drydock Review - the review-system integration surface.
//!
//! The pool consumes the review system through two narrow capability
//! traits:
//! - [`ReviewClient`]: listing/fetching changes plus the mutating submit
//!   and advisory review calls
//! - [`Change`]: per-change apply/submit mechanics and the failure
//!   notifications routed back to reviewers
//!
//! Pool snapshots (the replay manifest format) live here too, along with
//! in-memory fakes for testing via the `fakes` module.

pub mod change;
pub mod client;
pub mod error;
pub mod fakes;
pub mod manifest;

pub use change::{ApplyError, Change, SubmitError};
pub use client::{filter_to_workspace, ReviewClient};
pub use error::{ReviewError, ReviewResult};
pub use manifest::{PendingEntry, PoolSnapshot};
