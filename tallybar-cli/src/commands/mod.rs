//! CLI command implementations.
//!
//! Commands share one way of turning the configuration and global flags
//! into a provider registry and an open [`FetchEngine`].

pub mod config;
pub mod key;
pub mod providers;
pub mod state;
pub mod usage;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tallybar_fetch::CredentialStore;
use tallybar_providers::{credential_store, ProviderRegistry, ZaiProvider, ZaiRegion};
use tallybar_store::{Config, EngineSettings, FetchEngine, FileDocumentStore};
use tracing::debug;

use crate::Cli;

/// Returns the configuration file this invocation uses.
pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(Config::default_path)
}

/// Loads the configuration and applies flag overrides.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let path = config_path(cli);
    let mut config = Config::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    if let Some(provider) = &cli.provider {
        config.provider = provider.trim().to_lowercase();
    }

    config.validate()?;
    Ok(config)
}

/// Builds the registry with the configured provider as default.
///
/// The configured base URL and reset period apply to the active provider
/// only.
pub fn build_registry(config: &Config) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::builtin()?;

    if let Some(region) = ZaiRegion::from_id(&config.provider) {
        let provider = match &config.base_url {
            Some(url) => ZaiProvider::with_base_url(region, url)
                .with_context(|| format!("Invalid base URL: {url}"))?,
            None => ZaiProvider::new(region)?,
        };
        registry.register(Arc::new(provider.with_reset_interval(config.reset_interval_secs)));
    }

    registry.set_default(&config.provider)?;
    Ok(registry)
}

/// Opens the engine for the configured provider, running crash recovery.
pub async fn open_engine(config: &Config) -> Result<Arc<FetchEngine>> {
    let registry = build_registry(config)?;
    let provider = registry.default_provider()?;
    let credentials: Arc<dyn CredentialStore> = Arc::from(credential_store(provider.id()));
    let store = Arc::new(FileDocumentStore::new(config.state_dir()));

    debug!(
        provider = provider.id(),
        state_dir = %config.state_dir().display(),
        "Opening fetch engine"
    );

    let engine = FetchEngine::builder(provider, credentials, store)
        .settings(EngineSettings::from(config))
        .open()
        .await?;

    Ok(Arc::new(engine))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("tallybar").chain(args.iter().copied()))
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = load_config(&cli(&["--config", path.to_str().unwrap()])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_provider_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config =
            load_config(&cli(&["--config", path.to_str().unwrap(), "--provider", "BigModel"]))
                .unwrap();
        assert_eq!(config.provider, "bigmodel");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"minIntervalSecs": 0}"#).unwrap();
        assert!(load_config(&cli(&["--config", path.to_str().unwrap()])).is_err());
    }

    #[test]
    fn test_corrupt_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_config(&cli(&["--config", path.to_str().unwrap()])).is_err());
    }

    #[test]
    fn test_registry_default_follows_config() {
        let config = Config {
            provider: "bigmodel".to_string(),
            ..Config::default()
        };
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.default_provider().unwrap().id(), "bigmodel");
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_registry_applies_reset_interval() {
        let config = Config {
            reset_interval_secs: 3_600,
            ..Config::default()
        };
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.default_provider().unwrap().reset_interval_secs(), 3_600);
        assert_eq!(registry.get("bigmodel").unwrap().reset_interval_secs(), 18_000);
    }

    #[test]
    fn test_registry_rejects_unknown_provider() {
        let config = Config {
            provider: "nope".to_string(),
            ..Config::default()
        };
        assert!(build_registry(&config).is_err());
    }

    #[test]
    fn test_registry_rejects_bad_base_url() {
        let config = Config {
            base_url: Some("not a url".to_string()),
            ..Config::default()
        };
        assert!(build_registry(&config).is_err());
    }
}
