//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Duration, Local};
use tallybar_core::{RunState, UsageLimit, UsageSnapshot};

use super::json::{KeyStatusOutput, ProviderInfoOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Width of the label column in usage output.
const LABEL_WIDTH: usize = 18;

/// Snapshots older than this are flagged as stale.
const STALE_AFTER_SECS: i64 = 1_800;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    /// Formats a snapshot along with the scheduler's view of it.
    pub fn format_usage(
        &self,
        snapshot: &UsageSnapshot,
        provider_name: &str,
        state: &RunState,
        now_epoch: i64,
    ) -> String {
        let mut lines = Vec::new();

        match snapshot.plan_name() {
            Some(plan) => lines.push(format!("{} · {}", self.bold(provider_name), self.blue(plan))),
            None => lines.push(self.bold(provider_name)),
        }

        lines.push(self.format_bucket(
            snapshot.primary_title(),
            snapshot.primary_pct(),
            snapshot.primary_used(),
            snapshot.primary_total(),
            snapshot.reset_epoch(),
            now_epoch,
        ));

        if snapshot.is_approaching_limit() {
            lines.push(self.yellow("Approaching limit"));
        }

        for limit in snapshot.secondary() {
            lines.push(self.format_limit(limit, now_epoch));
        }

        let age = now_epoch.saturating_sub(snapshot.fetched_at_epoch());
        let updated = self.dim(&format!("Updated {}", format_age(age)));
        if snapshot.is_stale(Duration::seconds(STALE_AFTER_SECS), now_epoch) {
            lines.push(format!("{updated} {}", self.yellow("(stale)")));
        } else {
            lines.push(updated);
        }

        if state.has_error() {
            lines.push(format!("{} {}", self.yellow("Last fetch failed:"), state.last_error));
        }

        lines.join("\n")
    }

    fn format_limit(&self, limit: &UsageLimit, now_epoch: i64) -> String {
        self.format_bucket(
            &limit.label,
            limit.pct,
            limit.used,
            limit.total,
            limit.reset_epoch,
            now_epoch,
        )
    }

    /// Formats one quota bucket with progress bar and detail lines.
    fn format_bucket(
        &self,
        label: &str,
        pct: Option<u8>,
        used: Option<f64>,
        total: Option<f64>,
        reset_epoch: Option<i64>,
        now_epoch: i64,
    ) -> String {
        let label = format!("{label}:");
        let indent = " ".repeat(LABEL_WIDTH + 1);

        let Some(pct) = pct else {
            return format!("{label:<width$} {}", self.dim("no data"), width = LABEL_WIDTH);
        };

        let remaining = 100.0 - f64::from(pct);
        let bar = self.progress_bar(remaining);
        let pct_str = self.color_for_percent(remaining, &format!("{remaining:.0}% left"));
        let mut result = format!("{label:<width$} {bar} {pct_str}", width = LABEL_WIDTH);

        if let (Some(used), Some(total)) = (used, total) {
            result.push_str(&format!(
                "\n{indent}{} / {} used",
                format_number(used),
                format_number(total)
            ));
        }

        if let Some(reset) = reset_epoch {
            let countdown = format_countdown(reset.saturating_sub(now_epoch));
            let at = DateTime::from_timestamp(reset, 0)
                .map(|at| format!(" ({})", at.with_timezone(&Local).format("%H:%M")))
                .unwrap_or_default();
            result.push_str(&format!("\n{indent}Resets {}", self.dim(&format!("{countdown}{at}"))));
        }

        result
    }

    /// Formats a progress bar.
    pub fn progress_bar(&self, percent_remaining: f64) -> String {
        let filled = ((percent_remaining / 100.0) * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_percent(percent_remaining, &bar)
    }

    /// Formats the persisted scheduler state.
    pub fn format_state(
        &self,
        state: &RunState,
        provider_name: &str,
        has_snapshot: bool,
        now_epoch: i64,
    ) -> String {
        let mut lines = Vec::new();

        lines.push(format!("{} Scheduler State", self.bold(provider_name)));
        lines.push("─".repeat(40));

        let next = if state.is_due(now_epoch) {
            self.green("due now")
        } else {
            format_countdown(state.next_fetch_epoch.saturating_sub(now_epoch))
        };
        lines.push(format!("Next fetch:      {next}"));

        let last = if state.last_fetch_epoch > 0 {
            format_age(now_epoch.saturating_sub(state.last_fetch_epoch))
        } else {
            "never".to_string()
        };
        lines.push(format!("Last success:    {last}"));

        let factor = if state.backoff_factor > 1 {
            self.yellow(&format!("×{}", state.backoff_factor))
        } else {
            format!("×{}", state.backoff_factor)
        };
        lines.push(format!("Backoff factor:  {factor}"));

        let failures = if state.consecutive_failure_count > 0 {
            self.red(&state.consecutive_failure_count.to_string())
        } else {
            "0".to_string()
        };
        lines.push(format!("Failures in row: {failures}"));

        if state.has_error() {
            lines.push(format!("Last error:      {}", self.red(&state.last_error)));
        }

        if state.last_known_reset_epoch > 0 {
            lines.push(format!(
                "Next reset:      {}",
                format_countdown(state.last_known_reset_epoch.saturating_sub(now_epoch))
            ));
        }
        if state.last_notified_reset_epoch > 0 {
            let at = DateTime::from_timestamp(state.last_notified_reset_epoch, 0)
                .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            lines.push(format!("Last notified:   {at}"));
        }

        let cache = if has_snapshot { "yes" } else { "no" };
        lines.push(format!("Cached usage:    {cache}"));

        lines.join("\n")
    }

    /// Formats provider list header.
    pub fn format_providers_header(&self) -> String {
        format!(
            "{:<12} {:<10} {:<8} {:<8} {}",
            self.bold("Provider"),
            self.bold("ID"),
            self.bold("Default"),
            self.bold("Key"),
            self.bold("Dashboard")
        )
    }

    /// Formats a single provider line.
    pub fn format_provider_line(&self, info: &ProviderInfoOutput) -> String {
        let default_str = if info.is_default {
            self.green("✓")
        } else {
            self.dim("−")
        };

        let key_str = if info.has_key {
            self.green("✓")
        } else {
            self.dim("−")
        };

        format!(
            "{:<12} {:<10} {:<8} {:<8} {}",
            info.display_name,
            info.id,
            default_str,
            key_str,
            info.dashboard_url.as_deref().unwrap_or("−")
        )
    }

    /// Formats where the API key comes from.
    pub fn format_key_status(&self, status: &KeyStatusOutput) -> String {
        match &status.source {
            Some(source) => format!(
                "{}: {} {}",
                self.bold(&status.provider),
                self.green("key configured"),
                self.dim(&format!("({source}, {})", status.masked.as_deref().unwrap_or("")))
            ),
            None => format!("{}: {}", self.bold(&status.provider), self.red("no key configured")),
        }
    }

    /// Formats an error message.
    pub fn format_error(&self, provider: &str, error: &str) -> String {
        format!("{}: {} - {}", self.bold(provider), self.red("Error"), error)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn blue(&self, text: &str) -> String {
        self.paint(BLUE, text)
    }
}

// ============================================================================
// Plain helpers
// ============================================================================

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Formats a time until an event.
pub fn format_countdown(secs: i64) -> String {
    if secs <= 0 {
        return "now".to_string();
    }
    if secs < 60 {
        return "in less than a minute".to_string();
    }

    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let mins = (secs % 3_600) / 60;

    if days > 0 {
        if hours > 0 {
            format!("in {days}d {hours}h")
        } else {
            format!("in {}", plural(days, "day"))
        }
    } else if hours > 0 {
        if mins > 0 {
            format!("in {hours}h {mins}m")
        } else {
            format!("in {}", plural(hours, "hour"))
        }
    } else {
        format!("in {}", plural(mins, "minute"))
    }
}

/// Formats the age of an event.
pub fn format_age(secs: i64) -> String {
    if secs < 60 {
        return "just now".to_string();
    }

    let days = secs / 86_400;
    let hours = secs / 3_600;
    let mins = secs / 60;

    if days > 0 {
        format!("{} ago", plural(days, "day"))
    } else if hours > 0 {
        format!("{} ago", plural(hours, "hour"))
    } else {
        format!("{} ago", plural(mins, "minute"))
    }
}

fn format_number(n: f64) -> String {
    if n >= 1_000_000.0 {
        format!("{:.1}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.1}K", n / 1_000.0)
    } else {
        format!("{n:.0}")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(500.0), "500");
        assert_eq!(format_number(4_230.0), "4.2K");
        assert_eq!(format_number(2_500_000.0), "2.5M");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "hour"), "1 hour");
        assert_eq!(plural(3, "hour"), "3 hours");
    }

    #[test]
    fn test_paint_respects_colors() {
        assert_eq!(TextFormatter::new(false).red("x"), "x");
        assert_eq!(TextFormatter::new(true).red("x"), "\x1b[31mx\x1b[0m");
    }
}
