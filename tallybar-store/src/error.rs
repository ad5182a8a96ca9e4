//! Store and engine error types.

use tallybar_fetch::KeychainError;
use thiserror::Error;

// ============================================================================
// Store Error
// ============================================================================

/// Errors from persistence and configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document has never been saved.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if the document simply does not exist yet.
    pub fn is_missing(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

// ============================================================================
// Engine Error
// ============================================================================

/// Errors surfaced by the fetch engine and its loops.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No API key is configured for the active provider.
    #[error("API key not set")]
    ApiKeyNotSet,

    /// Nothing fetched yet and the current attempt did not produce data.
    #[error("No cached usage data available")]
    NoCachedData,

    /// Non-retryable failure.
    #[error("{0}")]
    Fatal(String),

    /// The run loop stopped after too many consecutive failures.
    #[error("Giving up after {failures} consecutive failures")]
    GaveUp {
        /// Failure count at the time the loop stopped.
        failures: u32,
    },
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Fatal(format!("Persistence failed: {err}"))
    }
}

impl From<KeychainError> for EngineError {
    fn from(err: KeychainError) -> Self {
        EngineError::Fatal(format!("Credential store failed: {err}"))
    }
}

// ============================================================================
// Notify Error
// ============================================================================

/// Errors from the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The user has not allowed notifications.
    #[error("Notifications not authorized")]
    NotAuthorized,

    /// The platform rejected or failed to deliver the notification.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}
