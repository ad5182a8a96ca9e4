//! HTTP client with tracing and status mapping.
//!
//! Wraps reqwest with:
//! - A bounded per-request timeout (10 seconds by default)
//! - Request/response tracing
//! - Mapping of non-200 responses into [`ProviderError`] before any body
//!   decoding happens

use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::ProviderError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User agent string for TallyBar.
const USER_AGENT: &str = concat!("TallyBar/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// Single-attempt HTTP client used by providers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client with the default timeout.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { inner, timeout })
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs one GET with a bearer token and returns the body text.
    ///
    /// 401 and 403 map to [`ProviderError::Unauthorized`]; any other
    /// non-200 status maps to [`ProviderError::HttpStatus`]. Timeouts and
    /// transport failures map to [`ProviderError::Network`].
    #[instrument(skip(self, token), fields(url = %url))]
    pub async fn get_with_bearer(&self, url: &Url, token: &str) -> Result<String, ProviderError> {
        debug!("GET request with auth");

        let response = self
            .inner
            .get(url.clone())
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, timeout = e.is_timeout(), "Request failed"))?;

        let status = response.status();
        debug!(status = %status, "Response received");

        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::Unauthorized);
            }
            other => return Err(ProviderError::HttpStatus(other.as_u16())),
        }

        Ok(response.text().await?)
    }
}

// ============================================================================
// Tests
// ============================================================================
