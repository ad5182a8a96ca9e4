//! Provider abstraction.
//!
//! A provider knows how to fetch one backend's quota and how to turn that
//! backend's failures into retry decisions. The engine only ever talks to
//! `dyn UsageProvider`.

use async_trait::async_trait;
use tallybar_core::{BackoffDecision, UsageSnapshot};

use crate::error::ProviderError;

/// Default quota period (5 hours).
pub const DEFAULT_RESET_INTERVAL_SECS: i64 = 5 * 60 * 60;

/// A backend service that reports quota usage.
#[async_trait]
pub trait UsageProvider: Send + Sync {
    /// Stable identifier, e.g. `zai`.
    fn id(&self) -> &str;

    /// Name shown to users.
    fn display_name(&self) -> &str;

    /// Length of the provider's primary quota period.
    fn reset_interval_secs(&self) -> i64 {
        DEFAULT_RESET_INTERVAL_SECS
    }

    /// Fetches and normalizes the current quota.
    ///
    /// Performs exactly one outbound request.
    async fn fetch(&self, api_key: &str) -> Result<UsageSnapshot, ProviderError>;

    /// Maps a fetch failure to a retry decision.
    fn classify_error(&self, error: &ProviderError) -> BackoffDecision {
        classify_provider_error(error)
    }
}

/// Shared classification table.
///
/// | Error | Decision |
/// |---|---|
/// | `HttpStatus(429)` | backoff |
/// | `Network`, `DecodeFailure`, `Unknown`, other statuses | proceed |
/// | `Unauthorized`, `QuotaDataUnavailable`, `InvalidResponseShape` | stop |
pub fn classify_provider_error(error: &ProviderError) -> BackoffDecision {
    match error {
        ProviderError::HttpStatus(429) => {
            BackoffDecision::backoff("Rate limited by provider (HTTP 429)")
        }
        ProviderError::HttpStatus(code) => {
            BackoffDecision::proceed(format!("Provider returned HTTP {code}"))
        }
        ProviderError::Network(cause) => BackoffDecision::proceed(format!("Network error: {cause}")),
        ProviderError::DecodeFailure(cause) => {
            BackoffDecision::proceed(format!("Could not decode response: {cause}"))
        }
        ProviderError::Unknown(cause) => BackoffDecision::proceed(format!("Provider error: {cause}")),
        ProviderError::Unauthorized => {
            BackoffDecision::stop("API key was rejected; update it and try again")
        }
        ProviderError::QuotaDataUnavailable => {
            BackoffDecision::stop("Provider returned no primary quota data")
        }
        ProviderError::InvalidResponseShape => {
            BackoffDecision::stop("Provider response has an unexpected shape")
        }
    }
}
