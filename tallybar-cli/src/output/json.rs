//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tallybar_core::{RunState, UsageLimit, UsageSnapshot};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a usage snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOutput {
    pub provider: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    pub primary: LimitOutput,
    pub secondary: Vec<LimitOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fetch_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// One quota bucket.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOutput {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
}

impl From<&UsageLimit> for LimitOutput {
    fn from(limit: &UsageLimit) -> Self {
        Self {
            label: limit.label.clone(),
            used_percent: limit.pct,
            remaining_percent: limit.pct.map(|pct| 100u8.saturating_sub(pct)),
            used: limit.used,
            total: limit.total,
            remaining: limit.remaining,
            resets_at: epoch_to_datetime(limit.reset_epoch),
        }
    }
}

/// Scheduler state with derived timestamps.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateOutput {
    pub provider: String,
    #[serde(flatten)]
    pub state: RunState,
    pub due: bool,
    pub has_cached_snapshot: bool,
}

/// Provider info output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfoOutput {
    pub id: String,
    pub display_name: String,
    pub is_default: bool,
    pub has_key: bool,
    pub reset_interval_secs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
}

/// Where the API key for a provider comes from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusOutput {
    pub provider: String,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked: Option<String>,
}

fn epoch_to_datetime(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch.and_then(|secs| DateTime::from_timestamp(secs, 0))
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }

    /// Formats a snapshot along with the scheduler's view of it.
    pub fn format_usage(
        &self,
        snapshot: &UsageSnapshot,
        provider_name: &str,
        state: &RunState,
    ) -> Result<String> {
        self.format(&usage_output(snapshot, provider_name, state))
    }
}

/// Builds the JSON shape of a snapshot.
pub fn usage_output(snapshot: &UsageSnapshot, provider_name: &str, state: &RunState) -> UsageOutput {
    UsageOutput {
        provider: snapshot.provider_id().to_string(),
        display_name: provider_name.to_string(),
        plan_name: snapshot.plan_name().map(str::to_string),
        primary: LimitOutput {
            label: snapshot.primary_title().to_string(),
            used_percent: snapshot.primary_pct(),
            remaining_percent: snapshot.primary_remaining_pct(),
            used: snapshot.primary_used(),
            total: snapshot.primary_total(),
            remaining: snapshot.primary_remaining(),
            resets_at: snapshot.resets_at(),
        },
        secondary: snapshot.secondary().iter().map(LimitOutput::from).collect(),
        fetched_at: snapshot.fetched_at(),
        next_fetch_at: epoch_to_datetime(Some(state.next_fetch_epoch)),
        last_error: state.has_error().then(|| state.last_error.clone()),
    }
}
