//! Retry decisions produced by error classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the scheduler should do after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffAction {
    /// Transient failure; keep the current schedule.
    Proceed,
    /// Transient, but the server asked us to slow down.
    Backoff,
    /// Not retryable; surface to the user.
    Stop,
}

impl fmt::Display for BackoffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Proceed => "proceed",
            Self::Backoff => "backoff",
            Self::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Classification of one provider error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffDecision {
    /// Scheduler action.
    pub action: BackoffAction,
    /// Whether a later attempt may succeed without user action.
    pub is_retryable: bool,
    /// Human-readable description, stored as the run state's last error.
    pub description: String,
}

impl BackoffDecision {
    /// Transient failure, keep schedule.
    pub fn proceed(description: impl Into<String>) -> Self {
        Self {
            action: BackoffAction::Proceed,
            is_retryable: true,
            description: description.into(),
        }
    }

    /// Transient failure, slow down.
    pub fn backoff(description: impl Into<String>) -> Self {
        Self {
            action: BackoffAction::Backoff,
            is_retryable: true,
            description: description.into(),
        }
    }

    /// Non-retryable failure.
    pub fn stop(description: impl Into<String>) -> Self {
        Self {
            action: BackoffAction::Stop,
            is_retryable: false,
            description: description.into(),
        }
    }
}
