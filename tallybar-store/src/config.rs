//! Configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tallybar_core::CoreError;
use tallybar_fetch::backoff::{DEFAULT_MAX_BACKOFF_SECS, DEFAULT_MAX_JITTER_SECS};
use tallybar_fetch::DEFAULT_RESET_INTERVAL_SECS;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_config_path, default_data_dir};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Active provider id.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Overrides the provider's API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Normal time between fetches.
    #[serde(default = "default_base_interval")]
    pub base_interval_secs: u64,
    /// Lower bound for the base interval.
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,
    /// Upper bound for a backed-off wait, before jitter.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
    /// Upper bound for the random jitter added to a backed-off wait.
    #[serde(default = "default_max_jitter")]
    pub max_jitter_secs: u64,
    /// Length of the provider's quota period.
    #[serde(default = "default_reset_interval")]
    pub reset_interval_secs: i64,
    /// Consecutive failures after which the run loop gives up.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How often the reset notifier checks for a passed reset.
    #[serde(default = "default_notify_interval")]
    pub notify_interval_secs: u64,
    /// Whether reset notifications are shown.
    #[serde(default = "default_true")]
    pub notifications: bool,
    /// Where run state and the snapshot cache live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

fn default_provider() -> String {
    "zai".to_string()
}

fn default_base_interval() -> u64 {
    300
}

fn default_min_interval() -> u64 {
    60
}

fn default_max_backoff() -> u64 {
    DEFAULT_MAX_BACKOFF_SECS
}

fn default_max_jitter() -> u64 {
    DEFAULT_MAX_JITTER_SECS
}

fn default_reset_interval() -> i64 {
    DEFAULT_RESET_INTERVAL_SECS
}

fn default_failure_threshold() -> u32 {
    10
}

fn default_notify_interval() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            base_interval_secs: default_base_interval(),
            min_interval_secs: default_min_interval(),
            max_backoff_secs: default_max_backoff(),
            max_jitter_secs: default_max_jitter(),
            reset_interval_secs: default_reset_interval(),
            failure_threshold: default_failure_threshold(),
            notify_interval_secs: default_notify_interval(),
            notifications: true,
            state_dir: None,
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from a specific path.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to the default path.
    pub fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path())
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Checks that the knobs are usable together.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.provider.trim().is_empty() {
            return Err(CoreError::InvalidConfig("provider must not be empty".to_string()));
        }
        if self.min_interval_secs == 0 {
            return Err(CoreError::InvalidConfig("minIntervalSecs must be positive".to_string()));
        }
        if self.max_backoff_secs < self.min_interval_secs {
            return Err(CoreError::InvalidConfig(format!(
                "maxBackoffSecs ({}) must be at least minIntervalSecs ({})",
                self.max_backoff_secs, self.min_interval_secs
            )));
        }
        if self.reset_interval_secs <= 0 {
            return Err(CoreError::InvalidConfig("resetIntervalSecs must be positive".to_string()));
        }
        if self.failure_threshold == 0 {
            return Err(CoreError::InvalidConfig("failureThreshold must be positive".to_string()));
        }
        if self.notify_interval_secs == 0 {
            return Err(CoreError::InvalidConfig("notifyIntervalSecs must be positive".to_string()));
        }
        Ok(())
    }

    /// Base interval after clamping to the minimum.
    pub fn effective_base_interval(&self) -> u64 {
        self.base_interval_secs.max(self.min_interval_secs)
    }

    /// Directory for run state and the snapshot cache.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_data_dir)
    }
}
