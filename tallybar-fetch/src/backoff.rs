//! Backoff arithmetic for rate-limited fetches.

use rand::Rng;
use tallybar_core::{MAX_BACKOFF_FACTOR, MIN_BACKOFF_FACTOR};

/// Default cap on a backoff wait.
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 900;

/// Default upper bound of the random jitter added to a backoff wait.
pub const DEFAULT_MAX_JITTER_SECS: u64 = 15;

/// How long to wait after the server asks us to slow down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum backoff factor.
    pub max_factor: u32,
    /// Maximum delay before jitter.
    pub max_backoff_secs: u64,
    /// Maximum jitter added on top of the delay.
    pub max_jitter_secs: u64,
}

impl BackoffPolicy {
    /// Creates a policy with the given delay cap and jitter bound.
    pub fn new(max_backoff_secs: u64, max_jitter_secs: u64) -> Self {
        Self {
            max_factor: MAX_BACKOFF_FACTOR,
            max_backoff_secs,
            max_jitter_secs,
        }
    }

    /// Doubles the factor, capped at `max_factor`.
    pub fn next_factor(&self, factor: u32) -> u32 {
        factor
            .max(MIN_BACKOFF_FACTOR)
            .saturating_mul(2)
            .min(self.max_factor)
    }

    /// Delay for `factor` before jitter: `min(base * factor, max_backoff)`.
    pub fn delay_secs(&self, base_secs: u64, factor: u32) -> u64 {
        base_secs
            .saturating_mul(u64::from(factor))
            .min(self.max_backoff_secs)
    }

    /// Delay for `factor` plus uniform jitter in `[0, max_jitter]`.
    pub fn jittered_delay_secs(&self, base_secs: u64, factor: u32) -> u64 {
        let jitter = rand::thread_rng().gen_range(0..=self.max_jitter_secs);
        self.delay_secs(base_secs, factor).saturating_add(jitter)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BACKOFF_SECS, DEFAULT_MAX_JITTER_SECS)
    }
}
