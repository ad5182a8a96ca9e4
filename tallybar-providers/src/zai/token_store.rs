//! z.ai API key storage.
//!
//! Keys are loaded from, in priority order:
//!
//! 1. **Environment** - `ZAI_API_KEY` / `ZAI_API_TOKEN` (or the BigModel
//!    equivalents)
//! 2. **Keychain** - `tallybar:<provider>` / `api_key`
//!
//! Writes and deletes always go to the keychain.

use std::fmt;

use async_trait::async_trait;
use tallybar_fetch::{CredentialStore, EnvCredentials, KeychainCredentials, KeychainError};
use tracing::{debug, instrument};

use super::descriptor::ZaiRegion;

/// Where a key was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// An environment variable.
    Env(String),
    /// The writable backend (normally the system keychain).
    Keychain,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(var) => write!(f, "${var}"),
            Self::Keychain => f.write_str("keychain"),
        }
    }
}

/// Layered credential store for one z.ai region.
pub struct ZaiTokenStore {
    env: Vec<EnvCredentials>,
    backend: Box<dyn CredentialStore>,
}

impl ZaiTokenStore {
    /// Creates the store for a region: its environment variables, then the
    /// system keychain.
    pub fn new(region: ZaiRegion) -> Self {
        Self::with_sources(
            region.api_key_env_vars(),
            Box::new(KeychainCredentials::for_provider(region.id())),
        )
    }

    /// Creates a store from explicit sources.
    pub fn with_sources(env_vars: &[&str], backend: Box<dyn CredentialStore>) -> Self {
        Self {
            env: env_vars.iter().map(|var| EnvCredentials::new(*var)).collect(),
            backend,
        }
    }

    /// Reads the key along with where it came from.
    #[instrument(skip(self))]
    pub async fn read_with_source(&self) -> Result<Option<(String, TokenSource)>, KeychainError> {
        for env in &self.env {
            if let Some(key) = env.read().await? {
                debug!(source = env.var(), "Loaded API key from environment");
                return Ok(Some((key, TokenSource::Env(env.var().to_string()))));
            }
        }

        let key = self.backend.read().await?;
        if key.is_some() {
            debug!(source = "keychain", "Loaded API key");
        }
        Ok(key.map(|key| (key, TokenSource::Keychain)))
    }
}

#[async_trait]
impl CredentialStore for ZaiTokenStore {
    async fn read(&self) -> Result<Option<String>, KeychainError> {
        Ok(self.read_with_source().await?.map(|(key, _)| key))
    }

    async fn write(&self, secret: &str) -> Result<(), KeychainError> {
        self.backend.write(secret).await
    }

    async fn delete(&self) -> Result<(), KeychainError> {
        self.backend.delete().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallybar_fetch::MemoryCredentials;

    const UNSET: &[&str] = &["TALLYBAR_TEST_UNSET_ZAI_KEY_1", "TALLYBAR_TEST_UNSET_ZAI_KEY_2"];

    #[tokio::test]
    async fn test_falls_through_to_backend() {
        let store = ZaiTokenStore::with_sources(UNSET, Box::new(MemoryCredentials::with_secret("sk-kc")));
        let (key, source) = store.read_with_source().await.unwrap().unwrap();
        assert_eq!(key, "sk-kc");
        assert_eq!(source, TokenSource::Keychain);
        assert_eq!(source.to_string(), "keychain");
    }

    #[tokio::test]
    async fn test_write_and_delete_hit_backend() {
        let store = ZaiTokenStore::with_sources(UNSET, Box::new(MemoryCredentials::new()));
        assert!(!store.exists().await);

        store.write("sk-new").await.unwrap();
        assert_eq!(store.read().await.unwrap().as_deref(), Some("sk-new"));

        store.delete().await.unwrap();
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[test]
    fn test_env_source_display() {
        assert_eq!(TokenSource::Env("ZAI_API_KEY".to_string()).to_string(), "$ZAI_API_KEY");
    }
}
