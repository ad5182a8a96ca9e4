//! z.ai response parser.

use tallybar_core::{normalize, ProviderProfile, UsageSnapshot};
use tallybar_fetch::ProviderError;
use tracing::{debug, warn};

use super::api::ZaiQuotaResponse;

/// Parses a quota response body into a snapshot.
///
/// Envelope errors take precedence over payload shape. A payload without
/// the primary bucket is [`ProviderError::QuotaDataUnavailable`].
pub fn parse_quota_response(
    body: &str,
    profile: &ProviderProfile,
    fetched_at_epoch: i64,
) -> Result<UsageSnapshot, ProviderError> {
    debug!(len = body.len(), provider = profile.id, "Parsing quota response");

    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Failed to decode quota response");
        ProviderError::from(e)
    })?;
    if !value.is_object() {
        warn!("Quota response is not a JSON object");
        return Err(ProviderError::DecodeFailure(
            "expected a JSON object at the top level".to_string(),
        ));
    }

    let response: ZaiQuotaResponse = serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Failed to decode quota response");
        ProviderError::from(e)
    })?;

    if let Some(error) = response.application_error() {
        warn!(code = ?response.code, msg = ?response.msg, "Quota API returned an error");
        return Err(error);
    }

    let data = response.data.ok_or(ProviderError::InvalidResponseShape)?;

    normalize(&data.into_raw(), profile, fetched_at_epoch).ok_or(ProviderError::QuotaDataUnavailable)
}
