//! z.ai quota API wire types.

use serde::Deserialize;
use tallybar_core::{RawLimit, RawQuota, ResetTime};
use tallybar_fetch::ProviderError;

// ============================================================================
// Constants
// ============================================================================

/// Quota endpoint, relative to the region base URL.
pub const QUOTA_ENDPOINT: &str = "/api/monitor/usage/quota/limit";

/// Envelope code for a successful call.
const CODE_OK: i64 = 200;

/// Envelope codes that mean the caller is being rate limited.
const RATE_LIMIT_CODES: &[i64] = &[1302, 1303, 1305];

/// Envelope codes that mean the API key was rejected.
const AUTH_CODES: &[i64] = &[1000, 1001, 1002, 1003];

// ============================================================================
// API Response Types
// ============================================================================

/// Envelope returned by the quota endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZaiQuotaResponse {
    /// Application status code; `200` on success.
    #[serde(default)]
    pub code: Option<i64>,

    /// Application message.
    #[serde(default)]
    pub msg: Option<String>,

    /// Success flag.
    #[serde(default)]
    pub success: Option<bool>,

    /// Payload.
    #[serde(default)]
    pub data: Option<ZaiQuotaData>,
}

/// Quota payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZaiQuotaData {
    /// Quota buckets.
    #[serde(default)]
    pub limits: Vec<ZaiLimit>,

    /// Subscription plan name.
    #[serde(default, alias = "plan_name", alias = "plan")]
    pub plan_name: Option<String>,
}

/// One quota bucket.
///
/// Note the naming: `usage` is the bucket size and `current_value` is the
/// amount consumed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZaiLimit {
    /// Bucket type, e.g. `TOKENS_LIMIT` or `TIME_LIMIT`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Window unit code.
    #[serde(default)]
    pub unit: Option<i64>,

    /// Window length in `unit`s.
    #[serde(default)]
    pub number: Option<i64>,

    /// Bucket size.
    #[serde(default)]
    pub usage: Option<f64>,

    /// Amount consumed.
    #[serde(default)]
    pub current_value: Option<f64>,

    /// Amount remaining.
    #[serde(default)]
    pub remaining: Option<f64>,

    /// Percentage used.
    #[serde(default)]
    pub percentage: Option<f64>,

    /// Next reset, in seconds, milliseconds, or RFC 3339.
    #[serde(default)]
    pub next_reset_time: Option<ResetTime>,
}

impl ZaiQuotaResponse {
    /// Returns the error carried by the envelope, if any.
    pub fn application_error(&self) -> Option<ProviderError> {
        let failed = self.success == Some(false) || self.code.is_some_and(|code| code != CODE_OK);
        if !failed {
            return None;
        }

        let message = self.msg.clone().unwrap_or_default();
        let error = match self.code {
            Some(code) if RATE_LIMIT_CODES.contains(&code) => ProviderError::HttpStatus(429),
            Some(code) if AUTH_CODES.contains(&code) => ProviderError::Unauthorized,
            Some(code) if message.is_empty() => ProviderError::Unknown(format!("code {code}")),
            Some(code) => ProviderError::Unknown(format!("code {code}: {message}")),
            None if message.is_empty() => ProviderError::Unknown("request failed".to_string()),
            None => ProviderError::Unknown(message),
        };
        Some(error)
    }
}

impl ZaiQuotaData {
    /// Lowers the payload to the provider-neutral shape.
    pub fn into_raw(self) -> RawQuota {
        RawQuota {
            limits: self.limits.into_iter().map(ZaiLimit::into_raw).collect(),
            plan_name: self.plan_name.filter(|name| !name.trim().is_empty()),
        }
    }
}

impl ZaiLimit {
    fn into_raw(self) -> RawLimit {
        RawLimit {
            kind: self.kind,
            percentage: self.percentage,
            used: self.current_value,
            total: self.usage,
            remaining: self.remaining,
            reset: self.next_reset_time,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
