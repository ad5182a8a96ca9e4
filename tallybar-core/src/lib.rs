// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # TallyBar Core
//!
//! Core types and normalization rules shared by every other TallyBar crate:
//!
//! - Domain models (usage snapshots, run state, backoff decisions)
//! - Reset timestamp encodings
//! - The quota normalizer
//! - Error types
//!
//! ## Key Types
//!
//! - [`UsageSnapshot`] - Normalized quota with primary and secondary buckets
//! - [`UsageLimit`] - A secondary bucket
//! - [`ResetTime`] - Seconds, milliseconds, or ISO-8601 reset time
//! - [`RunState`] - Persisted scheduler state
//! - [`BackoffDecision`] - What to do after a failed fetch
//! - [`normalize()`] - Raw provider quota to snapshot

pub mod error;
pub mod models;
pub mod normalize;

pub use error::CoreError;

pub use models::{
    BackoffAction, BackoffDecision, ResetTime, RunState, UsageLimit, UsageSnapshot,
    MAX_BACKOFF_FACTOR, MILLIS_THRESHOLD, MIN_BACKOFF_FACTOR,
};

pub use normalize::{derive_pct, humanize_kind, normalize, ProviderProfile, RawLimit, RawQuota};
