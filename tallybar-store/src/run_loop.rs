//! Background fetch loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tallybar_core::UsageSnapshot;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::engine::FetchEngine;
use crate::error::EngineError;

/// Default number of consecutive failures before the loop gives up.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 10;

/// Longest single sleep between schedule checks.
pub const DEFAULT_MAX_SLEEP: Duration = Duration::from_secs(60);

/// Extra time a sleep may overrun before it counts as a host wake.
pub const WAKE_GRACE_SECS: i64 = 30;

/// Drives [`FetchEngine::fetch_if_due`] on the engine's schedule.
pub struct FetchLoop {
    engine: Arc<FetchEngine>,
    clock: Arc<dyn Clock>,
    failure_threshold: u32,
    max_sleep: Duration,
    wakes: AtomicU64,
}

impl FetchLoop {
    /// Creates a loop on the engine's clock with default limits.
    pub fn new(engine: Arc<FetchEngine>) -> Self {
        let clock = engine.clock();
        Self {
            engine,
            clock,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            max_sleep: DEFAULT_MAX_SLEEP,
            wakes: AtomicU64::new(0),
        }
    }

    /// Sets the failure count at which the loop stops.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Sets the longest single sleep.
    #[must_use]
    pub fn with_max_sleep(mut self, max_sleep: Duration) -> Self {
        self.max_sleep = max_sleep;
        self
    }

    /// Number of host wakes detected so far.
    pub fn wakes_detected(&self) -> u64 {
        self.wakes.load(Ordering::Relaxed)
    }

    /// Runs until shutdown or until too many consecutive failures.
    ///
    /// Only failures that happen while this call runs count toward the
    /// threshold. A persisted count left by an earlier run is the baseline
    /// until the next success clears it.
    ///
    /// Returns `Ok(())` on shutdown and [`EngineError::GaveUp`] when the
    /// failure threshold is reached.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), EngineError> {
        let mut baseline = self.engine.run_state().await.consecutive_failure_count;
        info!(
            provider = self.engine.provider_id(),
            failure_threshold = self.failure_threshold,
            inherited_failures = baseline,
            "Fetch loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.engine.fetch_if_due().await;
            let wait = self.wait_after(&outcome).await;

            let total = self.engine.run_state().await.consecutive_failure_count;
            if total < baseline {
                baseline = 0;
            }
            let failures = total - baseline;
            if failures >= self.failure_threshold {
                error!(failures, "Too many consecutive failures, stopping fetch loop");
                return Err(EngineError::GaveUp { failures });
            }

            let sleep = wait.min(self.max_sleep);
            let before = self.clock.now_epoch();

            tokio::select! {
                () = tokio::time::sleep(sleep) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            let slept = self.clock.now_epoch().saturating_sub(before);
            if is_wake(sleep, slept) {
                self.wakes.fetch_add(1, Ordering::Relaxed);
                info!(slept_secs = slept, "Host wake detected");
                match self.engine.handle_wake_from_sleep().await {
                    Ok(Some(snapshot)) => debug!(pct = ?snapshot.primary_pct(), "Caught up after wake"),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Fetch after wake failed"),
                }
            }
        }

        info!(wakes = self.wakes_detected(), "Fetch loop stopped");
        Ok(())
    }

    /// Logs an iteration's outcome and returns how long to wait.
    async fn wait_after(&self, outcome: &Result<UsageSnapshot, EngineError>) -> Duration {
        match outcome {
            Ok(snapshot) => {
                debug!(pct = ?snapshot.primary_pct(), "Usage current");
            }
            Err(EngineError::NoCachedData) => {
                debug!("No usage data yet");
            }
            Err(EngineError::ApiKeyNotSet) => {
                warn!("API key not set; waiting one interval");
                return Duration::from_secs(self.engine.base_interval_secs().await);
            }
            Err(e) => {
                error!(error = %e, "Fetch failed");
                return Duration::from_secs(self.engine.base_interval_secs().await);
            }
        }

        Duration::from_secs(self.engine.secs_until_due().await.max(1))
    }
}

/// Returns true if a sleep overran by more than the grace period.
fn is_wake(requested: Duration, slept_secs: i64) -> bool {
    let requested = i64::try_from(requested.as_secs()).unwrap_or(i64::MAX);
    slept_secs > requested.saturating_add(WAKE_GRACE_SECS)
}

// ============================================================================
// Tests
// ============================================================================
