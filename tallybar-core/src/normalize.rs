//! Conversion of provider quota payloads into [`UsageSnapshot`]s.
//!
//! Each provider lowers its wire payload into a [`RawQuota`] and describes
//! itself with a [`ProviderProfile`]; [`normalize`] does the rest.

use tracing::debug;

use crate::models::{PrimaryQuota, ResetTime, UsageLimit, UsageSnapshot};

// ============================================================================
// Raw Input
// ============================================================================

/// One quota bucket as reported by a provider.
#[derive(Debug, Clone, Default)]
pub struct RawLimit {
    /// Provider-specific type tag, e.g. `TOKENS_LIMIT`.
    pub kind: String,
    /// Explicit percentage used, when the provider sends one.
    pub percentage: Option<f64>,
    /// Amount used.
    pub used: Option<f64>,
    /// Bucket size.
    pub total: Option<f64>,
    /// Amount remaining.
    pub remaining: Option<f64>,
    /// Reset timestamp in whatever encoding the provider used.
    pub reset: Option<ResetTime>,
}

impl RawLimit {
    /// Creates an entry with only a type tag set.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }
}

/// A provider response lowered to the provider-neutral shape.
#[derive(Debug, Clone, Default)]
pub struct RawQuota {
    /// Buckets in provider order.
    pub limits: Vec<RawLimit>,
    /// Plan name, if reported.
    pub plan_name: Option<String>,
}

/// Static description of how to read one provider's quota list.
#[derive(Debug, Clone, Copy)]
pub struct ProviderProfile {
    /// Provider id stamped into snapshots.
    pub id: &'static str,
    /// Type tag of the primary bucket.
    pub primary_kind: &'static str,
    /// Fixed labels for known bucket types.
    pub labels: &'static [(&'static str, &'static str)],
}

impl ProviderProfile {
    /// Display label for a bucket type.
    pub fn label_for(&self, kind: &str) -> String {
        self.labels
            .iter()
            .find(|(known, _)| *known == kind)
            .map_or_else(|| humanize_kind(kind), |(_, label)| (*label).to_string())
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Converts a raw quota list into a snapshot.
///
/// Returns `None` when no entry carries the profile's primary tag; a
/// snapshot is never built without its primary quota.
pub fn normalize(
    raw: &RawQuota,
    profile: &ProviderProfile,
    fetched_at_epoch: i64,
) -> Option<UsageSnapshot> {
    let Some(primary_index) = raw
        .limits
        .iter()
        .position(|limit| limit.kind == profile.primary_kind)
    else {
        debug!(
            provider = profile.id,
            primary = profile.primary_kind,
            entries = raw.limits.len(),
            "No primary quota entry"
        );
        return None;
    };

    let entry = &raw.limits[primary_index];
    let primary = PrimaryQuota {
        title: profile.label_for(&entry.kind),
        pct: derive_pct(entry.percentage, entry.used, entry.total),
        used: entry.used,
        total: entry.total,
        remaining: entry.remaining,
        reset_epoch: entry.reset.as_ref().and_then(ResetTime::to_epoch_secs),
    };

    let secondary = raw
        .limits
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != primary_index)
        .map(|(_, limit)| UsageLimit {
            label: profile.label_for(&limit.kind),
            pct: derive_pct(limit.percentage, limit.used, limit.total),
            used: limit.used,
            total: limit.total,
            remaining: limit.remaining,
            reset_epoch: limit.reset.as_ref().and_then(ResetTime::to_epoch_secs),
        })
        .collect();

    Some(UsageSnapshot::from_parts(
        profile.id,
        fetched_at_epoch,
        primary,
        secondary,
        raw.plan_name.clone(),
    ))
}

/// Derives an integer percentage used.
///
/// An explicit percentage wins and is floored. Otherwise the value is
/// `floor(100 * used / total)`, or `0` when `total <= 0`. Results are
/// clamped to `0..=100`.
pub fn derive_pct(percentage: Option<f64>, used: Option<f64>, total: Option<f64>) -> Option<u8> {
    let value = match (percentage.filter(|p| p.is_finite()), used, total) {
        (Some(pct), _, _) => pct,
        (None, _, Some(total)) if total <= 0.0 => 0.0,
        (None, Some(used), Some(total)) => (100.0 * used) / total,
        _ => return None,
    };

    if !value.is_finite() {
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(value.floor().clamp(0.0, 100.0) as u8)
}

/// Turns an unknown type tag into a label: `MONTHLY_WEB_SEARCH` becomes
/// `Monthly Web Search`.
pub fn humanize_kind(kind: &str) -> String {
    let words: Vec<String> = kind
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        "Unknown".to_string()
    } else {
        words.join(" ")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: ProviderProfile = ProviderProfile {
        id: "zai",
        primary_kind: "TOKENS_LIMIT",
        labels: &[("TOKENS_LIMIT", "Tokens (5h)"), ("TIME_LIMIT", "Search (Monthly)")],
    };

    fn limit(kind: &str, used: f64, total: f64) -> RawLimit {
        RawLimit {
            used: Some(used),
            total: Some(total),
            ..RawLimit::new(kind)
        }
    }

    #[test]
    fn test_pct_from_usage_and_total() {
        assert_eq!(derive_pct(None, Some(4230.0), Some(10_000.0)), Some(42));
    }

    #[test]
    fn test_pct_zero_total() {
        assert_eq!(derive_pct(None, Some(4230.0), Some(0.0)), Some(0));
        assert_eq!(derive_pct(None, None, Some(-5.0)), Some(0));
    }

    #[test]
    fn test_explicit_pct_is_floored() {
        assert_eq!(derive_pct(Some(42.9), Some(1.0), Some(2.0)), Some(42));
        assert_eq!(derive_pct(Some(f64::NAN), Some(1.0), Some(4.0)), Some(25));
    }

    #[test]
    fn test_pct_clamped_and_missing() {
        assert_eq!(derive_pct(Some(150.0), None, None), Some(100));
        assert_eq!(derive_pct(None, Some(-3.0), Some(10.0)), Some(0));
        assert_eq!(derive_pct(None, Some(3.0), None), None);
        assert_eq!(derive_pct(None, None, None), None);
    }

    #[test]
    fn test_humanize_kind() {
        assert_eq!(humanize_kind("MONTHLY_WEB_SEARCH"), "Monthly Web Search");
        assert_eq!(humanize_kind("reader_calls"), "Reader Calls");
        assert_eq!(humanize_kind("__"), "Unknown");
    }

    #[test]
    fn test_label_table_and_fallback() {
        assert_eq!(PROFILE.label_for("TIME_LIMIT"), "Search (Monthly)");
        assert_eq!(PROFILE.label_for("IMAGE_LIMIT"), "Image Limit");
    }

    #[test]
    fn test_normalize_splits_primary_and_secondary() {
        let raw = RawQuota {
            limits: vec![
                limit("TIME_LIMIT", 10.0, 100.0),
                RawLimit {
                    reset: Some(ResetTime::Millis(1_737_100_800_000)),
                    remaining: Some(5770.0),
                    ..limit("TOKENS_LIMIT", 4230.0, 10_000.0)
                },
                limit("IMAGE_LIMIT", 1.0, 4.0),
                limit("TOKENS_LIMIT", 1.0, 1.0),
            ],
            plan_name: Some("Pro".to_string()),
        };

        let snapshot = normalize(&raw, &PROFILE, 1_700).unwrap();
        assert_eq!(snapshot.provider_id(), "zai");
        assert_eq!(snapshot.fetched_at_epoch(), 1_700);
        assert_eq!(snapshot.primary_title(), "Tokens (5h)");
        assert_eq!(snapshot.primary_pct(), Some(42));
        assert_eq!(snapshot.primary_remaining(), Some(5770.0));
        assert_eq!(snapshot.reset_epoch(), Some(1_737_100_800));
        assert_eq!(snapshot.plan_name(), Some("Pro"));

        let labels: Vec<&str> = snapshot.secondary().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["Search (Monthly)", "Image Limit", "Tokens (5h)"]);
        assert_eq!(snapshot.secondary()[0].pct, Some(10));
        assert_eq!(snapshot.secondary()[1].pct, Some(25));
    }

    #[test]
    fn test_normalize_without_primary_is_absent() {
        let raw = RawQuota {
            limits: vec![limit("TIME_LIMIT", 10.0, 100.0)],
            plan_name: Some("Pro".to_string()),
        };
        assert!(normalize(&raw, &PROFILE, 0).is_none());
        assert!(normalize(&RawQuota::default(), &PROFILE, 0).is_none());
    }

    #[test]
    fn test_unparsable_reset_does_not_fail_snapshot() {
        let raw = RawQuota {
            limits: vec![RawLimit {
                reset: Some(ResetTime::Iso8601("soon".to_string())),
                ..limit("TOKENS_LIMIT", 1.0, 2.0)
            }],
            plan_name: None,
        };
        let snapshot = normalize(&raw, &PROFILE, 0).unwrap();
        assert_eq!(snapshot.reset_epoch(), None);
        assert_eq!(snapshot.primary_pct(), Some(50));
    }
}
