//! Test doubles shared by the engine, run loop, and notifier tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tallybar_core::{normalize, ProviderProfile, RawLimit, RawQuota, ResetTime, UsageSnapshot};
use tallybar_fetch::{CredentialStore, MemoryCredentials, ProviderError, UsageProvider};

use crate::clock::ManualClock;
use crate::engine::{EngineSettings, FetchEngine};
use crate::persistence::MemoryDocumentStore;

/// Clock start for every harness.
pub const START: i64 = 1_737_000_000;

const PROFILE: ProviderProfile = ProviderProfile {
    id: "zai",
    primary_kind: "TOKENS_LIMIT",
    labels: &[("TOKENS_LIMIT", "Tokens (5h)")],
};

/// Builds a snapshot with the given percentage and reset.
pub fn snapshot(pct: u8, reset_epoch: Option<i64>) -> UsageSnapshot {
    let raw = RawQuota {
        limits: vec![RawLimit {
            percentage: Some(f64::from(pct)),
            reset: reset_epoch.map(ResetTime::Seconds),
            ..RawLimit::new("TOKENS_LIMIT")
        }],
        plan_name: None,
    };
    normalize(&raw, &PROFILE, START).expect("primary entry present")
}

// ============================================================================
// Fake Provider
// ============================================================================

/// Provider that replays a script of results.
///
/// Once the script is exhausted every fetch fails with a network error,
/// or with the configured repeating error.
#[derive(Default)]
pub struct FakeProvider {
    script: Mutex<VecDeque<Result<UsageSnapshot, ProviderError>>>,
    repeat: Option<ProviderError>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    advance: Option<(Arc<ManualClock>, i64)>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(self, snapshot: UsageSnapshot) -> Self {
        self.script.lock().unwrap().push_back(Ok(snapshot));
        self
    }

    pub fn push_err(self, error: ProviderError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn repeat_err(mut self, error: ProviderError) -> Self {
        self.repeat = Some(error);
        self
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    /// Moves `clock` forward by `secs` during every fetch.
    pub fn advancing(mut self, clock: Arc<ManualClock>, secs: i64) -> Self {
        self.advance = Some((clock, secs));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsageProvider for FakeProvider {
    fn id(&self) -> &str {
        "zai"
    }

    fn display_name(&self) -> &str {
        "z.ai"
    }

    async fn fetch(&self, api_key: &str) -> Result<UsageSnapshot, ProviderError> {
        assert_eq!(api_key, "sk-test");
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((clock, secs)) = &self.advance {
            clock.advance(*secs);
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Err(self
                .repeat
                .clone()
                .unwrap_or_else(|| ProviderError::Network("script exhausted".to_string())))
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: Arc<FetchEngine>,
    pub provider: Arc<FakeProvider>,
    pub store: Arc<MemoryDocumentStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn open_with(provider: FakeProvider, store: Arc<MemoryDocumentStore>) -> Self {
        Self::open_full(provider, store, Arc::new(MemoryCredentials::with_secret("sk-test"))).await
    }

    pub async fn open_full(
        provider: FakeProvider,
        store: Arc<MemoryDocumentStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self::open_with_clock(provider, store, credentials, Arc::new(ManualClock::new(START))).await
    }

    pub async fn open_with_clock(
        provider: FakeProvider,
        store: Arc<MemoryDocumentStore>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<ManualClock>,
    ) -> Self {
        let provider = Arc::new(provider);
        let engine = FetchEngine::builder(provider.clone(), credentials, store.clone())
            .clock(clock.clone())
            .settings(EngineSettings::default())
            .open()
            .await
            .unwrap();

        Self {
            engine: Arc::new(engine),
            provider,
            store,
            clock,
        }
    }
}

/// Opens an engine over a fresh in-memory store with a valid key.
pub async fn harness(provider: FakeProvider) -> Harness {
    Harness::open_with(provider, Arc::new(MemoryDocumentStore::new())).await
}
