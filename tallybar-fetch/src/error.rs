//! Fetch error types.

use thiserror::Error;

// ============================================================================
// Provider Error
// ============================================================================

/// Error type for provider fetches.
///
/// Every failure of a provider fetch is expressed in this taxonomy so the
/// provider can classify it into a retry decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Transport failure, including timeouts.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status (or an in-body code treated as one).
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    DecodeFailure(String),

    /// Response decoded but lacks the expected structure.
    #[error("Response has an unexpected shape")]
    InvalidResponseShape,

    /// Credentials were rejected.
    #[error("API key rejected")]
    Unauthorized,

    /// Response contained no usable quota data.
    #[error("Quota data unavailable")]
    QuotaDataUnavailable,

    /// Anything else the provider reported.
    #[error("Unknown provider error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::DecodeFailure(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::HttpStatus(status.as_u16())
        } else {
            // Timeouts, connect failures, and body read failures all land here.
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::DecodeFailure(err.to_string())
    }
}

// ============================================================================
// Keychain Error
// ============================================================================

/// Error type for credential store operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Access denied.
    #[error("Access denied to keychain")]
    AccessDenied,

    /// The store cannot be written to.
    #[error("Credential store is read-only: {0}")]
    ReadOnly(String),

    /// Platform error.
    #[error("Platform error: {0}")]
    Platform(String),

    /// Generic error.
    #[error("Keychain error: {0}")]
    Other(String),
}

impl From<keyring::Error> for KeychainError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::Ambiguous(_) => {
                KeychainError::Other("Ambiguous credential entry".to_string())
            }
            keyring::Error::PlatformFailure(e) => KeychainError::Platform(e.to_string()),
            keyring::Error::NoStorageAccess(_) => KeychainError::AccessDenied,
            _ => KeychainError::Other(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_decode_failure() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        assert!(matches!(ProviderError::from(err), ProviderError::DecodeFailure(_)));
    }
}
