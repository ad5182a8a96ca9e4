//! Quota reset notifications.
//!
//! Watches the engine's run state and tells the user once per quota period
//! that their quota has reset.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::engine::FetchEngine;
use crate::error::EngineError;
use crate::notifier::Notifier;

/// Default time between checks.
pub const DEFAULT_NOTIFY_INTERVAL: Duration = Duration::from_secs(60);

/// Result of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No unnotified reset has passed.
    Idle,
    /// A reset is pending but notifications are not allowed.
    Denied,
    /// Delivery failed; the reset stays pending.
    SendFailed,
    /// The known reset changed while sending; nothing was recorded.
    Superseded,
    /// Notified about the reset at `epoch`.
    Sent {
        /// The reset that was announced.
        epoch: i64,
    },
}

/// Periodic watcher that announces quota resets.
pub struct ResetNotifier {
    engine: Arc<FetchEngine>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ResetNotifier {
    /// Creates a watcher on the engine's clock with the default cadence.
    pub fn new(engine: Arc<FetchEngine>, notifier: Arc<dyn Notifier>) -> Self {
        let clock = engine.clock();
        Self {
            engine,
            notifier,
            clock,
            interval: DEFAULT_NOTIFY_INTERVAL,
        }
    }

    /// Sets the time between checks.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Performs one check.
    ///
    /// Only persistence failures are returned as errors.
    pub async fn tick(&self) -> Result<TickOutcome, EngineError> {
        let state = self.engine.run_state().await;
        let now = self.clock.now_epoch();

        if !state.reset_pending(now) {
            return Ok(TickOutcome::Idle);
        }

        let epoch = state.last_known_reset_epoch;
        if !self.notifier.is_authorized() {
            warn!(epoch, "Quota reset passed but notifications are not authorized");
            return Ok(TickOutcome::Denied);
        }

        let (title, body) = reset_message(self.engine.provider_name(), epoch);
        if let Err(e) = self.notifier.send(&title, &body).await {
            warn!(epoch, error = %e, "Failed to send reset notification");
            return Ok(TickOutcome::SendFailed);
        }

        if self.engine.record_reset_notified(epoch).await? {
            info!(epoch, "Quota reset notified");
            Ok(TickOutcome::Sent { epoch })
        } else {
            debug!(epoch, "Known reset changed during notification");
            Ok(TickOutcome::Superseded)
        }
    }

    /// Checks on a fixed cadence until `shutdown` turns true or its sender
    /// is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Reset notifier started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.tick().await {
                warn!(error = %e, "Reset notifier tick failed");
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Reset notifier stopped");
    }
}

/// Builds the notification title and body.
fn reset_message(provider_name: &str, epoch: i64) -> (String, String) {
    let title = format!("{provider_name} quota reset");
    let body = match DateTime::from_timestamp(epoch, 0) {
        Some(at) => format!(
            "Your {provider_name} quota reset at {} UTC.",
            at.format("%H:%M")
        ),
        None => format!("Your {provider_name} quota has reset."),
    };
    (title, body)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::RecordingNotifier;
    use crate::testing::{harness, snapshot, FakeProvider, Harness, START};

    async fn setup(reset: i64) -> (Harness, Arc<RecordingNotifier>, ResetNotifier) {
        let h = harness(FakeProvider::new().push_ok(snapshot(90, Some(reset)))).await;
        h.engine.force_fetch().await.unwrap();
        let recorder = Arc::new(RecordingNotifier::new());
        let watcher = ResetNotifier::new(Arc::clone(&h.engine), recorder.clone());
        (h, recorder, watcher)
    }

    #[test]
    fn test_reset_message() {
        let (title, body) = reset_message("z.ai", 1_769_904_000);
        assert_eq!(title, "z.ai quota reset");
        assert_eq!(body, "Your z.ai quota reset at 00:00 UTC.");
    }

    #[tokio::test]
    async fn test_idle_before_reset() {
        let (_h, recorder, watcher) = setup(START + 100).await;
        assert_eq!(watcher.tick().await.unwrap(), TickOutcome::Idle);
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn test_idle_without_known_reset() {
        let h = harness(FakeProvider::new().push_ok(snapshot(90, None))).await;
        h.engine.force_fetch().await.unwrap();
        let watcher = ResetNotifier::new(Arc::clone(&h.engine), Arc::new(RecordingNotifier::new()));
        assert_eq!(watcher.tick().await.unwrap(), TickOutcome::Idle);
    }

    #[tokio::test]
    async fn test_notifies_once_and_advances() {
        let (h, recorder, watcher) = setup(START + 100).await;
        h.clock.advance(100);

        assert_eq!(
            watcher.tick().await.unwrap(),
            TickOutcome::Sent { epoch: START + 100 }
        );
        assert_eq!(recorder.sent().len(), 1);

        let state = h.engine.run_state().await;
        assert_eq!(state.last_notified_reset_epoch, START + 100);
        assert_eq!(state.last_known_reset_epoch, START + 100 + 18_000);

        assert_eq!(watcher.tick().await.unwrap(), TickOutcome::Idle);
        assert_eq!(recorder.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_next_period_notifies_again() {
        let (h, recorder, watcher) = setup(START).await;
        watcher.tick().await.unwrap();

        h.clock.advance(18_000);
        assert_eq!(
            watcher.tick().await.unwrap(),
            TickOutcome::Sent { epoch: START + 18_000 }
        );
        assert_eq!(recorder.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_denied_leaves_state() {
        let (h, recorder, watcher) = setup(START).await;
        recorder.set_authorized(false);
        let before = h.engine.run_state().await;

        assert_eq!(watcher.tick().await.unwrap(), TickOutcome::Denied);
        assert_eq!(h.engine.run_state().await, before);
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_retries_next_tick() {
        let (h, recorder, watcher) = setup(START).await;
        recorder.set_failing(true);
        let before = h.engine.run_state().await;

        assert_eq!(watcher.tick().await.unwrap(), TickOutcome::SendFailed);
        assert_eq!(h.engine.run_state().await, before);

        recorder.set_failing(false);
        assert_eq!(watcher.tick().await.unwrap(), TickOutcome::Sent { epoch: START });
    }

    #[tokio::test]
    async fn test_persist_failure_is_returned() {
        let (h, _recorder, watcher) = setup(START).await;
        h.store.set_fail_writes(true);
        assert!(matches!(watcher.tick().await, Err(EngineError::Fatal(_))));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (_h, recorder, watcher) = setup(START).await;
        let watcher = watcher.with_interval(Duration::from_secs(3_600));
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move { watcher.run(rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recorder.sent().len(), 1);
    }
}
