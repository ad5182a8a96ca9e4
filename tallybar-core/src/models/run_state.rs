//! Persisted scheduler state.

use serde::{Deserialize, Serialize};

/// Lowest allowed backoff factor.
pub const MIN_BACKOFF_FACTOR: u32 = 1;

/// Highest allowed backoff factor.
pub const MAX_BACKOFF_FACTOR: u32 = 15;

/// Process-wide fetch scheduling state.
///
/// One instance exists per process. It is loaded on startup and written back
/// after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunState {
    /// When the next fetch is due, in epoch seconds.
    pub next_fetch_epoch: i64,
    /// Multiplier applied to the base interval after rate limiting.
    pub backoff_factor: u32,
    /// When the last successful fetch happened.
    pub last_fetch_epoch: i64,
    /// Description of the most recent failure; empty when none.
    pub last_error: String,
    /// Most recently observed primary quota reset time.
    pub last_known_reset_epoch: i64,
    /// Reset time that was last notified about.
    pub last_notified_reset_epoch: i64,
    /// Failed attempts since the last success.
    pub consecutive_failure_count: u32,
}

impl RunState {
    /// Creates a fresh state with a fetch due immediately.
    pub fn new(now_epoch: i64) -> Self {
        Self {
            next_fetch_epoch: now_epoch,
            ..Self::default()
        }
    }

    /// Returns true if a fetch is due.
    pub fn is_due(&self, now_epoch: i64) -> bool {
        now_epoch >= self.next_fetch_epoch
    }

    /// Returns true if there is a known reset that has passed and has not
    /// been notified yet.
    pub fn reset_pending(&self, now_epoch: i64) -> bool {
        self.last_known_reset_epoch > 0
            && now_epoch >= self.last_known_reset_epoch
            && self.last_notified_reset_epoch != self.last_known_reset_epoch
    }

    /// Returns true if a failure message is recorded.
    pub fn has_error(&self) -> bool {
        !self.last_error.is_empty()
    }

    /// Clamps fields that a hand-edited or older document may have left
    /// out of range.
    pub fn sanitize(&mut self) {
        self.backoff_factor = self
            .backoff_factor
            .clamp(MIN_BACKOFF_FACTOR, MAX_BACKOFF_FACTOR);
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            next_fetch_epoch: 0,
            backoff_factor: MIN_BACKOFF_FACTOR,
            last_fetch_epoch: 0,
            last_error: String::new(),
            last_known_reset_epoch: 0,
            last_notified_reset_epoch: 0,
            consecutive_failure_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_due_now() {
        let state = RunState::new(500);
        assert!(state.is_due(500));
        assert!(!state.is_due(499));
        assert_eq!(state.backoff_factor, 1);
        assert!(!state.has_error());
    }

    #[test]
    fn test_reset_pending() {
        let mut state = RunState::new(0);
        assert!(!state.reset_pending(10_000), "no known reset yet");

        state.last_known_reset_epoch = 5_000;
        assert!(!state.reset_pending(4_999));
        assert!(state.reset_pending(5_000));

        state.last_notified_reset_epoch = 5_000;
        assert!(!state.reset_pending(6_000));
    }

    #[test]
    fn test_sanitize_clamps_factor() {
        let mut state = RunState { backoff_factor: 0, ..RunState::default() };
        state.sanitize();
        assert_eq!(state.backoff_factor, 1);

        state.backoff_factor = 64;
        state.sanitize();
        assert_eq!(state.backoff_factor, 15);
    }
}
