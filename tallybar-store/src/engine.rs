//! Fetch engine.
//!
//! The engine owns the process-wide [`RunState`] and the cached
//! [`UsageSnapshot`]. Every public operation takes one async mutex for its
//! whole duration, so at most one fetch attempt is ever in flight and
//! operations apply in the order they were invoked.
//!
//! ## Fetch attempt
//!
//! 1. Read the API key; missing is [`EngineError::ApiKeyNotSet`].
//! 2. Call the provider. On success cache the snapshot, reset backoff, and
//!    schedule the next fetch one base interval out.
//! 3. On a provider error, classify it:
//!    - `proceed`: schedule one base interval out
//!    - `backoff`: double the factor and wait `min(base * factor, max)` plus
//!      jitter
//!    - `stop`: record the error and fail with [`EngineError::Fatal`]
//!
//! The run state is persisted before any attempt returns.

use std::sync::Arc;

use tallybar_core::{BackoffAction, RunState, UsageSnapshot};
use tallybar_fetch::{BackoffPolicy, CredentialStore, ProviderError, UsageProvider};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::EngineError;
use crate::persistence::{
    load_document, save_document, DocumentStore, RUN_STATE_DOC, SNAPSHOT_DOC,
};

// ============================================================================
// Settings
// ============================================================================

/// Scheduling knobs for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Normal time between fetches.
    pub base_interval_secs: u64,
    /// Lower bound for the base interval.
    pub min_interval_secs: u64,
    /// Backoff arithmetic.
    pub policy: BackoffPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            base_interval_secs: config.base_interval_secs,
            min_interval_secs: config.min_interval_secs,
            policy: BackoffPolicy::new(config.max_backoff_secs, config.max_jitter_secs),
        }
    }
}

fn secs_i64(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

// ============================================================================
// Builder
// ============================================================================

/// Collects the engine's collaborators before crash recovery runs.
pub struct EngineBuilder {
    provider: Arc<dyn UsageProvider>,
    credentials: Arc<dyn CredentialStore>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl EngineBuilder {
    /// Replaces the wall clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the scheduling settings.
    #[must_use]
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Loads persisted state and returns a ready engine.
    ///
    /// Missing or unreadable state starts fresh and a missing or unreadable
    /// snapshot starts with an empty cache; both are logged. A schedule
    /// left in the past is moved to now and persisted once.
    #[instrument(skip(self), fields(provider = self.provider.id()))]
    pub async fn open(self) -> Result<FetchEngine, EngineError> {
        let now = self.clock.now_epoch();
        let store = &*self.store;

        let mut state = match load_document::<RunState>(store, RUN_STATE_DOC).await {
            Ok(state) => state,
            Err(e) if e.is_missing() => {
                info!("No saved run state, starting fresh");
                RunState::default()
            }
            Err(e) => {
                warn!(error = %e, "Saved run state is unreadable, starting fresh");
                RunState::default()
            }
        };
        state.sanitize();

        let snapshot = match load_document::<UsageSnapshot>(store, SNAPSHOT_DOC).await {
            Ok(snapshot) if snapshot.provider_id() == self.provider.id() => Some(snapshot),
            Ok(snapshot) => {
                debug!(cached = snapshot.provider_id(), "Ignoring snapshot from another provider");
                None
            }
            Err(e) if e.is_missing() => {
                debug!("No cached snapshot");
                None
            }
            Err(e) => {
                warn!(error = %e, "Cached snapshot is unreadable, discarding");
                None
            }
        };

        if state.next_fetch_epoch < now {
            debug!(stale = state.next_fetch_epoch, now, "Moving past schedule to now");
            state.next_fetch_epoch = now;
            save_document(store, RUN_STATE_DOC, &state).await?;
        }

        let base_interval_secs = self
            .settings
            .base_interval_secs
            .max(self.settings.min_interval_secs);

        info!(
            base_interval_secs,
            next_fetch = state.next_fetch_epoch,
            backoff_factor = state.backoff_factor,
            cached = snapshot.is_some(),
            "Fetch engine ready"
        );

        Ok(FetchEngine {
            provider: self.provider,
            credentials: self.credentials,
            store: self.store,
            clock: self.clock,
            policy: self.settings.policy,
            min_interval_secs: self.settings.min_interval_secs,
            inner: Mutex::new(Inner {
                state,
                snapshot,
                base_interval_secs,
            }),
        })
    }
}

// ============================================================================
// Fetch Engine
// ============================================================================

struct Inner {
    state: RunState,
    snapshot: Option<UsageSnapshot>,
    base_interval_secs: u64,
}

/// Scheduler and cache for one provider.
pub struct FetchEngine {
    provider: Arc<dyn UsageProvider>,
    credentials: Arc<dyn CredentialStore>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    policy: BackoffPolicy,
    min_interval_secs: u64,
    inner: Mutex<Inner>,
}

impl FetchEngine {
    /// Starts building an engine with the system clock and default settings.
    pub fn builder(
        provider: Arc<dyn UsageProvider>,
        credentials: Arc<dyn CredentialStore>,
        store: Arc<dyn DocumentStore>,
    ) -> EngineBuilder {
        EngineBuilder {
            provider,
            credentials,
            store,
            clock: Arc::new(SystemClock),
            settings: EngineSettings::default(),
        }
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Returns true if a fetch is due.
    pub async fn should_fetch(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.state.is_due(self.clock.now_epoch())
    }

    /// Fetches if due, otherwise serves the cache.
    ///
    /// A transient failure also serves the cache. With nothing cached the
    /// result is [`EngineError::NoCachedData`].
    #[instrument(skip(self), fields(provider = self.provider.id()))]
    pub async fn fetch_if_due(&self) -> Result<UsageSnapshot, EngineError> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now_epoch();

        if !inner.state.is_due(now) {
            debug!(next_fetch = inner.state.next_fetch_epoch, "Not due, serving cache");
            return inner.snapshot.clone().ok_or(EngineError::NoCachedData);
        }

        self.attempt(&mut inner, now).await
    }

    /// Fetches now regardless of schedule or backoff.
    #[instrument(skip(self), fields(provider = self.provider.id()))]
    pub async fn force_fetch(&self) -> Result<UsageSnapshot, EngineError> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now_epoch();
        self.attempt(&mut inner, now).await
    }

    /// Catches up after the host slept.
    ///
    /// Performs one attempt if a fetch is due and returns `None` otherwise.
    #[instrument(skip(self), fields(provider = self.provider.id()))]
    pub async fn handle_wake_from_sleep(&self) -> Result<Option<UsageSnapshot>, EngineError> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now_epoch();

        if !inner.state.is_due(now) {
            debug!(next_fetch = inner.state.next_fetch_epoch, "Woke before due time");
            return Ok(None);
        }

        info!("Fetch overdue after wake");
        self.attempt(&mut inner, now).await.map(Some)
    }

    /// Sets the base interval, clamped to the configured minimum.
    ///
    /// Takes effect at the next reschedule.
    pub async fn set_base_interval(&self, secs: u64) {
        let clamped = secs.max(self.min_interval_secs);
        if clamped != secs {
            debug!(requested = secs, clamped, "Base interval below minimum");
        }
        self.inner.lock().await.base_interval_secs = clamped;
        info!(base_interval_secs = clamped, "Base interval updated");
    }

    // ========================================================================
    // Reset Notification
    // ========================================================================

    /// Records that the reset at `epoch` was notified.
    ///
    /// Marks `epoch` as notified and advances the known reset by one quota
    /// period, then persists. Returns `false` without changing anything if
    /// the known reset is no longer `epoch`.
    #[instrument(skip(self))]
    pub async fn record_reset_notified(&self, epoch: i64) -> Result<bool, EngineError> {
        let mut inner = self.inner.lock().await;

        if inner.state.last_known_reset_epoch != epoch {
            debug!(known = inner.state.last_known_reset_epoch, "Known reset moved, skipping");
            return Ok(false);
        }

        let period = self.provider.reset_interval_secs();
        inner.state.last_notified_reset_epoch = epoch;
        inner.state.last_known_reset_epoch = epoch.saturating_add(period);
        debug!(next_reset = inner.state.last_known_reset_epoch, "Reset notified");

        self.persist_state(&inner.state).await?;
        Ok(true)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns a copy of the run state.
    pub async fn run_state(&self) -> RunState {
        self.inner.lock().await.state.clone()
    }

    /// Returns the cached snapshot.
    pub async fn cached_snapshot(&self) -> Option<UsageSnapshot> {
        self.inner.lock().await.snapshot.clone()
    }

    /// Returns the base interval in effect.
    pub async fn base_interval_secs(&self) -> u64 {
        self.inner.lock().await.base_interval_secs
    }

    /// Seconds until the next fetch is due, never negative.
    pub async fn secs_until_due(&self) -> u64 {
        let next = self.inner.lock().await.state.next_fetch_epoch;
        u64::try_from(next.saturating_sub(self.clock.now_epoch())).unwrap_or(0)
    }

    /// Active provider id.
    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Active provider name.
    pub fn provider_name(&self) -> &str {
        self.provider.display_name()
    }

    /// Length of the provider's quota period.
    pub fn reset_interval_secs(&self) -> i64 {
        self.provider.reset_interval_secs()
    }

    /// The engine's clock.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    // ========================================================================
    // Fetch Attempt
    // ========================================================================

    async fn attempt(&self, inner: &mut Inner, now: i64) -> Result<UsageSnapshot, EngineError> {
        let api_key = match self.credentials.read().await {
            Ok(Some(key)) if !key.trim().is_empty() => key,
            Ok(_) => {
                warn!("API key not set");
                return Err(EngineError::ApiKeyNotSet);
            }
            Err(e) => {
                error!(error = %e, "Credential store failed");
                return Err(e.into());
            }
        };

        match self.provider.fetch(&api_key).await {
            Ok(snapshot) => {
                self.record_success(inner, &snapshot, now).await?;
                Ok(snapshot)
            }
            Err(e) => self.record_failure(inner, &e, now).await,
        }
    }

    async fn record_success(
        &self,
        inner: &mut Inner,
        snapshot: &UsageSnapshot,
        now: i64,
    ) -> Result<(), EngineError> {
        let mut state = inner.state.clone();
        state.last_fetch_epoch = now;
        state.backoff_factor = 1;
        state.last_error.clear();
        state.consecutive_failure_count = 0;
        state.next_fetch_epoch = now.saturating_add(secs_i64(inner.base_interval_secs));
        if let Some(reset) = snapshot.reset_epoch() {
            state.last_known_reset_epoch = reset;
        }

        info!(
            pct = ?snapshot.primary_pct(),
            reset = ?snapshot.reset_epoch(),
            next_fetch = state.next_fetch_epoch,
            "Fetch succeeded"
        );

        // Memory only moves after the matching write lands.
        self.persist_state(&state).await?;
        inner.state = state;

        save_document(&*self.store, SNAPSHOT_DOC, snapshot)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to persist snapshot");
                EngineError::from(e)
            })?;
        inner.snapshot = Some(snapshot.clone());
        Ok(())
    }

    async fn record_failure(
        &self,
        inner: &mut Inner,
        error: &ProviderError,
        now: i64,
    ) -> Result<UsageSnapshot, EngineError> {
        let decision = self.provider.classify_error(error);
        let base = inner.base_interval_secs;
        let state = &mut inner.state;

        state.consecutive_failure_count = state.consecutive_failure_count.saturating_add(1);
        state.last_error.clone_from(&decision.description);

        match decision.action {
            BackoffAction::Proceed => {
                state.next_fetch_epoch = now.saturating_add(secs_i64(base));
                warn!(
                    error = %error,
                    failures = state.consecutive_failure_count,
                    next_fetch = state.next_fetch_epoch,
                    "Transient fetch failure"
                );
            }
            BackoffAction::Backoff => {
                state.backoff_factor = self.policy.next_factor(state.backoff_factor);
                let wait = self.policy.jittered_delay_secs(base, state.backoff_factor);
                state.next_fetch_epoch = now.saturating_add(secs_i64(wait));
                warn!(
                    factor = state.backoff_factor,
                    wait_secs = wait,
                    failures = state.consecutive_failure_count,
                    "Rate limited, backing off"
                );
            }
            BackoffAction::Stop => {
                error!(error = %error, "Fetch failed permanently");
            }
        }

        self.persist_state(&inner.state).await?;

        if decision.action == BackoffAction::Stop {
            return Err(EngineError::Fatal(decision.description));
        }
        inner.snapshot.clone().ok_or(EngineError::NoCachedData)
    }

    async fn persist_state(&self, state: &RunState) -> Result<(), EngineError> {
        save_document(&*self.store, RUN_STATE_DOC, state)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to persist run state");
                EngineError::from(e)
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
