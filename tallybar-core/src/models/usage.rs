//! Usage-related types.
//!
//! This module contains the normalized quota model:
//! - [`UsageSnapshot`] - One provider response, primary quota plus secondaries
//! - [`UsageLimit`] - A secondary quota bucket

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Usage Limit
// ============================================================================

/// A secondary quota bucket (e.g. monthly web-search calls).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimit {
    /// Display label, e.g. `Search (Monthly)`.
    pub label: String,
    /// Percentage of the bucket used (0-100).
    pub pct: Option<u8>,
    /// Amount used.
    pub used: Option<f64>,
    /// Bucket size.
    pub total: Option<f64>,
    /// Amount remaining.
    pub remaining: Option<f64>,
    /// When the bucket resets, in epoch seconds.
    pub reset_epoch: Option<i64>,
}

// ============================================================================
// Usage Snapshot
// ============================================================================

/// A normalized snapshot of one provider's quota.
///
/// Only the normalizer builds snapshots, and only when the raw response
/// carried a primary quota entry. Snapshots are immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    provider_id: String,
    fetched_at_epoch: i64,
    primary_title: String,
    primary_pct: Option<u8>,
    primary_used: Option<f64>,
    primary_total: Option<f64>,
    primary_remaining: Option<f64>,
    reset_epoch: Option<i64>,
    #[serde(default)]
    secondary: Vec<UsageLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan_name: Option<String>,
}

/// Everything the normalizer resolved for the primary bucket.
#[derive(Debug, Clone, Default)]
pub(crate) struct PrimaryQuota {
    pub title: String,
    pub pct: Option<u8>,
    pub used: Option<f64>,
    pub total: Option<f64>,
    pub remaining: Option<f64>,
    pub reset_epoch: Option<i64>,
}

impl UsageSnapshot {
    pub(crate) fn from_parts(
        provider_id: &str,
        fetched_at_epoch: i64,
        primary: PrimaryQuota,
        secondary: Vec<UsageLimit>,
        plan_name: Option<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            fetched_at_epoch,
            primary_title: primary.title,
            primary_pct: primary.pct,
            primary_used: primary.used,
            primary_total: primary.total,
            primary_remaining: primary.remaining,
            reset_epoch: primary.reset_epoch,
            secondary,
            plan_name,
        }
    }

    /// Provider that produced this snapshot.
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// When the snapshot was fetched, in epoch seconds.
    pub fn fetched_at_epoch(&self) -> i64 {
        self.fetched_at_epoch
    }

    /// Display title of the primary quota.
    pub fn primary_title(&self) -> &str {
        &self.primary_title
    }

    /// Percentage of the primary quota used.
    pub fn primary_pct(&self) -> Option<u8> {
        self.primary_pct
    }

    /// Amount of the primary quota used.
    pub fn primary_used(&self) -> Option<f64> {
        self.primary_used
    }

    /// Size of the primary quota.
    pub fn primary_total(&self) -> Option<f64> {
        self.primary_total
    }

    /// Amount of the primary quota remaining.
    pub fn primary_remaining(&self) -> Option<f64> {
        self.primary_remaining
    }

    /// When the primary quota resets, in epoch seconds.
    pub fn reset_epoch(&self) -> Option<i64> {
        self.reset_epoch
    }

    /// Secondary buckets in provider order.
    pub fn secondary(&self) -> &[UsageLimit] {
        &self.secondary
    }

    /// Plan name, if the provider reported one.
    pub fn plan_name(&self) -> Option<&str> {
        self.plan_name.as_deref()
    }

    /// Returns the remaining percentage of the primary quota (100 - used).
    pub fn primary_remaining_pct(&self) -> Option<u8> {
        self.primary_pct.map(|pct| 100u8.saturating_sub(pct))
    }

    /// Returns the fetch time as a `DateTime`.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.fetched_at_epoch, 0)
    }

    /// Returns the primary reset time as a `DateTime`.
    pub fn resets_at(&self) -> Option<DateTime<Utc>> {
        self.reset_epoch.and_then(|epoch| DateTime::from_timestamp(epoch, 0))
    }

    /// Returns true if this snapshot is older than `max_age`.
    pub fn is_stale(&self, max_age: Duration, now_epoch: i64) -> bool {
        now_epoch.saturating_sub(self.fetched_at_epoch) > max_age.num_seconds()
    }

    /// Returns true if the primary quota is over 80% used.
    pub fn is_approaching_limit(&self) -> bool {
        self.primary_pct.is_some_and(|pct| pct > 80)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pct: Option<u8>, reset_epoch: Option<i64>) -> UsageSnapshot {
        UsageSnapshot::from_parts(
            "zai",
            1_000,
            PrimaryQuota {
                title: "Tokens (5h)".to_string(),
                pct,
                reset_epoch,
                ..Default::default()
            },
            Vec::new(),
            None,
        )
    }

    #[test]
    fn test_remaining_pct() {
        assert_eq!(snapshot(Some(42), None).primary_remaining_pct(), Some(58));
        assert_eq!(snapshot(Some(100), None).primary_remaining_pct(), Some(0));
        assert_eq!(snapshot(None, None).primary_remaining_pct(), None);
    }

    #[test]
    fn test_is_stale() {
        let snap = snapshot(Some(10), None);
        assert!(!snap.is_stale(Duration::seconds(60), 1_060));
        assert!(snap.is_stale(Duration::seconds(60), 1_061));
    }

    #[test]
    fn test_approaching_limit() {
        assert!(!snapshot(Some(80), None).is_approaching_limit());
        assert!(snapshot(Some(81), None).is_approaching_limit());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(snapshot(Some(42), Some(2_000))).unwrap();
        assert_eq!(json["providerId"], "zai");
        assert_eq!(json["primaryPct"], 42);
        assert_eq!(json["resetEpoch"], 2_000);
        assert!(json.get("planName").is_none());
    }
}
