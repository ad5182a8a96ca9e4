//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

use tallybar_core::{normalize, RawLimit, RawQuota, ResetTime, RunState, UsageSnapshot};
use tallybar_providers::ZaiRegion;

const NOW: i64 = 1_737_000_000;

fn snapshot(pct: f64, reset: Option<i64>, plan: Option<&str>) -> UsageSnapshot {
    let raw = RawQuota {
        limits: vec![
            RawLimit {
                percentage: Some(pct),
                used: Some(4_230.0),
                total: Some(10_000.0),
                reset: reset.map(ResetTime::Seconds),
                ..RawLimit::new("TOKENS_LIMIT")
            },
            RawLimit {
                used: Some(12.0),
                total: Some(100.0),
                ..RawLimit::new("TIME_LIMIT")
            },
        ],
        plan_name: plan.map(str::to_string),
    };
    normalize(&raw, &ZaiRegion::Global.profile(), NOW - 120).unwrap()
}

mod text_formatter_tests {
    use super::*;
    use crate::output::text::{format_age, format_countdown};
    use crate::output::{KeyStatusOutput, ProviderInfoOutput, TextFormatter};

    #[test]
    fn test_progress_bar_boundary_values() {
        let formatter = TextFormatter::new(false);

        let test_cases = vec![
            (0.0, "░░░░░░░░░░"),
            (10.0, "█░░░░░░░░░"),
            (25.0, "███░░░░░░░"), // 2.5 rounds to 3 blocks
            (50.0, "█████░░░░░"),
            (75.0, "████████░░"), // 7.5 rounds to 8 blocks
            (100.0, "██████████"),
        ];

        for (percent, expected) in test_cases {
            let bar = formatter.progress_bar(percent);
            assert_eq!(bar, expected, "Failed for {percent}%");
        }
    }

    #[test]
    fn test_progress_bar_with_colors() {
        let formatter = TextFormatter::new(true);

        let bar = formatter.progress_bar(10.0);
        assert!(bar.contains("\x1b[31m"), "Should be red for <20%");

        let bar = formatter.progress_bar(40.0);
        assert!(bar.contains("\x1b[33m"), "Should be yellow for <50%");

        let bar = formatter.progress_bar(80.0);
        assert!(bar.contains("\x1b[32m"), "Should be green for >=50%");
    }

    #[test]
    fn test_format_usage_primary_and_secondary() {
        let formatter = TextFormatter::new(false);
        let snap = snapshot(42.0, Some(NOW + 2 * 3_600 + 14 * 60), Some("GLM Coding Pro"));
        let output = formatter.format_usage(&snap, "z.ai", &RunState::new(NOW), NOW);

        assert!(output.starts_with("z.ai · GLM Coding Pro"));
        assert!(output.contains("Tokens (5h):"));
        assert!(output.contains("58% left"));
        assert!(output.contains("4.2K / 10.0K used"));
        assert!(output.contains("Resets in 2h 14m"));
        assert!(output.contains("Search (Monthly):"));
        assert!(output.contains("88% left"));
        assert!(output.contains("Updated 2 minutes ago"));
        assert!(!output.contains("Last fetch failed"));
    }

    #[test]
    fn test_format_usage_without_plan_or_reset() {
        let formatter = TextFormatter::new(false);
        let snap = snapshot(10.0, None, None);
        let output = formatter.format_usage(&snap, "z.ai", &RunState::new(NOW), NOW);

        assert_eq!(output.lines().next(), Some("z.ai"));
        assert!(!output.contains("Resets"));
    }

    #[test]
    fn test_format_usage_flags_near_limit_and_stale() {
        let formatter = TextFormatter::new(false);
        let snap = snapshot(85.0, None, None);

        let fresh = formatter.format_usage(&snap, "z.ai", &RunState::new(NOW), NOW);
        assert!(fresh.contains("Approaching limit"));
        assert!(!fresh.contains("(stale)"));

        let later = formatter.format_usage(&snap, "z.ai", &RunState::new(NOW), NOW + 3_600);
        assert!(later.contains("Updated 1 hour ago (stale)"));

        let low = formatter.format_usage(&snapshot(42.0, None, None), "z.ai", &RunState::new(NOW), NOW);
        assert!(!low.contains("Approaching limit"));
    }

    #[test]
    fn test_format_usage_shows_last_error() {
        let formatter = TextFormatter::new(false);
        let state = RunState {
            last_error: "Rate limited by provider (HTTP 429)".to_string(),
            ..RunState::new(NOW)
        };
        let output = formatter.format_usage(&snapshot(10.0, None, None), "z.ai", &state, NOW);
        assert!(output.contains("Last fetch failed: Rate limited by provider (HTTP 429)"));
    }

    #[test]
    fn test_format_state() {
        let formatter = TextFormatter::new(false);
        let state = RunState {
            next_fetch_epoch: NOW + 600,
            backoff_factor: 2,
            last_fetch_epoch: NOW - 3_600,
            last_error: "Rate limited by provider (HTTP 429)".to_string(),
            consecutive_failure_count: 1,
            ..RunState::default()
        };
        let output = formatter.format_state(&state, "z.ai", true, NOW);

        assert!(output.contains("Next fetch:      in 10 minutes"));
        assert!(output.contains("Last success:    1 hour ago"));
        assert!(output.contains("Backoff factor:  ×2"));
        assert!(output.contains("Failures in row: 1"));
        assert!(output.contains("Last error:      Rate limited"));
        assert!(output.contains("Cached usage:    yes"));
    }

    #[test]
    fn test_format_state_fresh() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_state(&RunState::new(NOW), "z.ai", false, NOW);

        assert!(output.contains("due now"));
        assert!(output.contains("Last success:    never"));
        assert!(!output.contains("Last error"));
        assert!(output.contains("Cached usage:    no"));
    }

    #[test]
    fn test_countdown() {
        assert_eq!(format_countdown(-5), "now");
        assert_eq!(format_countdown(0), "now");
        assert_eq!(format_countdown(30), "in less than a minute");
        assert_eq!(format_countdown(60), "in 1 minute");
        assert_eq!(format_countdown(45 * 60), "in 45 minutes");
        assert_eq!(format_countdown(3_600), "in 1 hour");
        assert_eq!(format_countdown(5 * 3_600 + 60), "in 5h 1m");
        assert_eq!(format_countdown(86_400), "in 1 day");
        assert_eq!(format_countdown(2 * 86_400 + 3 * 3_600), "in 2d 3h");
    }

    #[test]
    fn test_age() {
        assert_eq!(format_age(10), "just now");
        assert_eq!(format_age(60), "1 minute ago");
        assert_eq!(format_age(7_200), "2 hours ago");
        assert_eq!(format_age(3 * 86_400), "3 days ago");
    }

    #[test]
    fn test_provider_line() {
        let formatter = TextFormatter::new(false);
        let info = ProviderInfoOutput {
            id: "zai".to_string(),
            display_name: "z.ai".to_string(),
            is_default: true,
            has_key: false,
            reset_interval_secs: 18_000,
            dashboard_url: Some("https://z.ai/manage-apikey/subscription".to_string()),
        };
        let line = formatter.format_provider_line(&info);
        assert!(line.starts_with("z.ai"));
        assert!(line.contains("✓"));
        assert!(line.contains("−"));
        assert!(line.ends_with("https://z.ai/manage-apikey/subscription"));
    }

    #[test]
    fn test_key_status() {
        let formatter = TextFormatter::new(false);
        let configured = KeyStatusOutput {
            provider: "zai".to_string(),
            configured: true,
            source: Some("keychain".to_string()),
            masked: Some("sk-a…wxyz".to_string()),
        };
        assert_eq!(
            formatter.format_key_status(&configured),
            "zai: key configured (keychain, sk-a…wxyz)"
        );

        let missing = KeyStatusOutput {
            provider: "zai".to_string(),
            configured: false,
            source: None,
            masked: None,
        };
        assert_eq!(formatter.format_key_status(&missing), "zai: no key configured");
    }

    #[test]
    fn test_format_error() {
        let formatter = TextFormatter::new(false);
        assert_eq!(
            formatter.format_error("z.ai", "API key not set"),
            "z.ai: Error - API key not set"
        );
    }
}

mod json_formatter_tests {
    use super::*;
    use crate::output::{JsonFormatter, StateOutput};
    use serde_json::Value;

    #[test]
    fn test_usage_json_shape() {
        let formatter = JsonFormatter::new(false);
        let snap = snapshot(42.0, Some(1_737_100_800), Some("GLM Coding Pro"));
        let state = RunState {
            next_fetch_epoch: NOW + 300,
            ..RunState::new(NOW)
        };
        let json: Value =
            serde_json::from_str(&formatter.format_usage(&snap, "z.ai", &state).unwrap()).unwrap();

        assert_eq!(json["provider"], "zai");
        assert_eq!(json["displayName"], "z.ai");
        assert_eq!(json["planName"], "GLM Coding Pro");
        assert_eq!(json["primary"]["label"], "Tokens (5h)");
        assert_eq!(json["primary"]["usedPercent"], 42);
        assert_eq!(json["primary"]["remainingPercent"], 58);
        assert_eq!(json["primary"]["resetsAt"], "2025-01-17T08:00:00Z");
        assert_eq!(json["secondary"][0]["label"], "Search (Monthly)");
        assert_eq!(json["secondary"][0]["usedPercent"], 12);
        assert!(json["secondary"][0].get("resetsAt").is_none());
        assert!(json.get("lastError").is_none());
        assert!(json["nextFetchAt"].is_string());
    }

    #[test]
    fn test_usage_json_includes_last_error() {
        let formatter = JsonFormatter::new(false);
        let state = RunState {
            last_error: "Network error: down".to_string(),
            ..RunState::new(NOW)
        };
        let json: Value = serde_json::from_str(
            &formatter
                .format_usage(&snapshot(10.0, None, None), "z.ai", &state)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(json["lastError"], "Network error: down");
    }

    #[test]
    fn test_state_json_is_flat() {
        let formatter = JsonFormatter::new(false);
        let output = StateOutput {
            provider: "zai".to_string(),
            state: RunState {
                backoff_factor: 4,
                ..RunState::new(NOW)
            },
            due: true,
            has_cached_snapshot: false,
        };
        let json: Value = serde_json::from_str(&formatter.format(&output).unwrap()).unwrap();

        assert_eq!(json["provider"], "zai");
        assert_eq!(json["nextFetchEpoch"], NOW);
        assert_eq!(json["backoffFactor"], 4);
        assert_eq!(json["due"], true);
        assert_eq!(json["hasCachedSnapshot"], false);
    }

    #[test]
    fn test_pretty_output() {
        let formatter = JsonFormatter::new(true);
        let output = formatter.format(&serde_json::json!({"a": 1})).unwrap();
        assert!(output.contains('\n'));

        let formatter = JsonFormatter::new(false);
        assert_eq!(formatter.format(&serde_json::json!({"a": 1})).unwrap(), r#"{"a":1}"#);
    }
}
