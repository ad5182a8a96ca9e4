//! z.ai usage provider.

use async_trait::async_trait;
use chrono::Utc;
use tallybar_core::UsageSnapshot;
use tallybar_fetch::{HttpClient, ProviderError, UsageProvider, DEFAULT_RESET_INTERVAL_SECS};
use tracing::{debug, instrument};
use url::Url;

use super::api::QUOTA_ENDPOINT;
use super::descriptor::ZaiRegion;
use super::parser::parse_quota_response;

/// Provider for the z.ai coding plan quota API.
#[derive(Debug, Clone)]
pub struct ZaiProvider {
    region: ZaiRegion,
    endpoint: Url,
    http: HttpClient,
    reset_interval_secs: i64,
}

impl ZaiProvider {
    /// Creates a provider for the region's default endpoint.
    pub fn new(region: ZaiRegion) -> Result<Self, ProviderError> {
        Self::with_base_url(region, region.base_url())
    }

    /// Creates a provider against a custom base URL (gateway or mock server).
    pub fn with_base_url(region: ZaiRegion, base_url: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            region,
            endpoint: quota_endpoint(base_url)?,
            http: HttpClient::new()?,
            reset_interval_secs: DEFAULT_RESET_INTERVAL_SECS,
        })
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    /// Overrides the quota period.
    #[must_use]
    pub fn with_reset_interval(mut self, secs: i64) -> Self {
        self.reset_interval_secs = secs;
        self
    }

    /// Returns the region.
    pub fn region(&self) -> ZaiRegion {
        self.region
    }

    /// Returns the full quota URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Joins the quota path onto a base URL, keeping any path prefix.
fn quota_endpoint(base_url: &str) -> Result<Url, ProviderError> {
    let joined = format!("{}{QUOTA_ENDPOINT}", base_url.trim_end_matches('/'));
    Url::parse(&joined)
        .map_err(|e| ProviderError::Unknown(format!("Invalid base URL '{base_url}': {e}")))
}

#[async_trait]
impl UsageProvider for ZaiProvider {
    fn id(&self) -> &str {
        self.region.id()
    }

    fn display_name(&self) -> &str {
        self.region.display_name()
    }

    fn reset_interval_secs(&self) -> i64 {
        self.reset_interval_secs
    }

    #[instrument(skip(self, api_key), fields(provider = self.region.id()))]
    async fn fetch(&self, api_key: &str) -> Result<UsageSnapshot, ProviderError> {
        let body = self.http.get_with_bearer(&self.endpoint, api_key).await?;
        let snapshot = parse_quota_response(&body, &self.region.profile(), Utc::now().timestamp())?;

        debug!(
            pct = ?snapshot.primary_pct(),
            reset = ?snapshot.reset_epoch(),
            secondary = snapshot.secondary().len(),
            "Quota fetched"
        );
        Ok(snapshot)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tallybar_core::BackoffAction;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OK_BODY: &str = r#"{
        "code": 200,
        "success": true,
        "data": {"limits": [{"type": "TOKENS_LIMIT", "usage": 200, "currentValue": 50}]}
    }"#;

    async fn provider_for(server: &MockServer, status: u16, body: &str) -> ZaiProvider {
        Mock::given(method("GET"))
            .and(path(QUOTA_ENDPOINT))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(server)
            .await;
        ZaiProvider::with_base_url(ZaiRegion::Global, &server.uri()).unwrap()
    }

    #[test]
    fn test_default_endpoints() {
        let global = ZaiProvider::new(ZaiRegion::Global).unwrap();
        assert_eq!(
            global.endpoint().as_str(),
            "https://api.z.ai/api/monitor/usage/quota/limit"
        );
        assert_eq!(global.id(), "zai");
        assert_eq!(global.reset_interval_secs(), 18_000);

        let china = ZaiProvider::new(ZaiRegion::China).unwrap();
        assert_eq!(
            china.endpoint().as_str(),
            "https://open.bigmodel.cn/api/monitor/usage/quota/limit"
        );
        assert_eq!(china.display_name(), "BigModel");
    }

    #[test]
    fn test_base_url_keeps_prefix() {
        let provider =
            ZaiProvider::with_base_url(ZaiRegion::Global, "https://gateway.local/zai/").unwrap();
        assert_eq!(
            provider.endpoint().as_str(),
            "https://gateway.local/zai/api/monitor/usage/quota/limit"
        );
        assert!(ZaiProvider::with_base_url(ZaiRegion::Global, "not a url").is_err());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, 200, OK_BODY).await;

        let snapshot = provider.fetch("sk-test").await.unwrap();
        assert_eq!(snapshot.provider_id(), "zai");
        assert_eq!(snapshot.primary_pct(), Some(25));
    }

    #[tokio::test]
    async fn test_fetch_http_401_is_unauthorized() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, 401, "").await;

        let err = provider.fetch("sk-test").await.unwrap_err();
        assert_eq!(err, ProviderError::Unauthorized);
        assert_eq!(provider.classify_error(&err).action, BackoffAction::Stop);
    }

    #[tokio::test]
    async fn test_fetch_body_rate_limit_backs_off() {
        let server = MockServer::start().await;
        let provider =
            provider_for(&server, 200, r#"{"code": 1302, "msg": "busy", "success": false}"#).await;

        let err = provider.fetch("sk-test").await.unwrap_err();
        assert_eq!(err, ProviderError::HttpStatus(429));
        assert_eq!(provider.classify_error(&err).action, BackoffAction::Backoff);
    }

    #[tokio::test]
    async fn test_fetch_server_error_proceeds() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, 502, "bad gateway").await;

        let err = provider.fetch("sk-test").await.unwrap_err();
        assert_eq!(err, ProviderError::HttpStatus(502));
        assert_eq!(provider.classify_error(&err).action, BackoffAction::Proceed);
    }

    #[tokio::test]
    async fn test_fetch_missing_data_stops() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, 200, r#"{"code": 200, "success": true}"#).await;

        let err = provider.fetch("sk-test").await.unwrap_err();
        assert_eq!(err, ProviderError::InvalidResponseShape);
        assert_eq!(provider.classify_error(&err).action, BackoffAction::Stop);
    }
}
