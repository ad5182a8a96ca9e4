//! Domain models for TallyBar.
//!
//! ## Submodules
//!
//! - [`usage`] - Normalized quota snapshot (UsageSnapshot, UsageLimit)
//! - [`reset`] - Reset timestamp wire encodings (ResetTime)
//! - [`run_state`] - Persisted scheduler state (RunState)
//! - [`decision`] - Error classification results (BackoffDecision)

mod decision;
mod reset;
mod run_state;
mod usage;

pub use decision::{BackoffAction, BackoffDecision};
pub use reset::{ResetTime, MILLIS_THRESHOLD};
pub use run_state::{RunState, MAX_BACKOFF_FACTOR, MIN_BACKOFF_FACTOR};
pub(crate) use usage::PrimaryQuota;
pub use usage::{UsageLimit, UsageSnapshot};
