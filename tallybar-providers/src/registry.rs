//! Provider registry.
//!
//! The registry owns one instance of every configured provider and is the
//! central point for looking them up by id.

use std::sync::Arc;

use tallybar_core::CoreError;
use tallybar_fetch::{CredentialStore, KeychainCredentials, ProviderError, UsageProvider};
use tracing::debug;

use crate::zai::{ZaiProvider, ZaiRegion, ZaiTokenStore};

// ============================================================================
// Provider Registry
// ============================================================================

/// Set of available providers with one marked as default.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn UsageProvider>>,
    default_id: Option<String>,
}

impl ProviderRegistry {
    /// Creates a registry from explicit providers. The first becomes the
    /// default.
    pub fn new(providers: Vec<Arc<dyn UsageProvider>>) -> Self {
        let default_id = providers.first().map(|p| p.id().to_string());
        Self {
            providers,
            default_id,
        }
    }

    /// Creates a registry with every built-in provider, z.ai first.
    pub fn builtin() -> Result<Self, ProviderError> {
        let providers = ZaiRegion::ALL
            .into_iter()
            .map(|region| ZaiProvider::new(region).map(|p| Arc::new(p) as Arc<dyn UsageProvider>))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(providers))
    }

    /// Adds a provider, replacing any existing one with the same id.
    pub fn register(&mut self, provider: Arc<dyn UsageProvider>) {
        debug!(provider = provider.id(), "Registering provider");
        if let Some(slot) = self.providers.iter_mut().find(|p| p.id() == provider.id()) {
            *slot = provider;
        } else {
            if self.default_id.is_none() {
                self.default_id = Some(provider.id().to_string());
            }
            self.providers.push(provider);
        }
    }

    /// Marks a registered provider as the default.
    pub fn set_default(&mut self, id: &str) -> Result<(), CoreError> {
        if !self.contains(id) {
            return Err(CoreError::ProviderNotFound(id.to_string()));
        }
        self.default_id = Some(id.to_string());
        Ok(())
    }

    /// Gets a provider by id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn UsageProvider>, CoreError> {
        self.providers
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| CoreError::ProviderNotFound(id.to_string()))
    }

    /// Returns the default provider.
    pub fn default_provider(&self) -> Result<Arc<dyn UsageProvider>, CoreError> {
        match &self.default_id {
            Some(id) => self.get(id),
            None => Err(CoreError::ProviderNotFound("<default>".to_string())),
        }
    }

    /// Returns all providers in registration order.
    pub fn all(&self) -> &[Arc<dyn UsageProvider>] {
        &self.providers
    }

    /// Returns all provider ids.
    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Returns true if a provider with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.providers.iter().any(|p| p.id() == id)
    }

    /// Returns the number of registered providers.
    pub fn count(&self) -> usize {
        self.providers.len()
    }
}

/// Returns the credential store for a provider id.
///
/// z.ai regions check their environment variables before the keychain;
/// anything else reads the keychain only.
pub fn credential_store(provider_id: &str) -> Box<dyn CredentialStore> {
    match ZaiRegion::from_id(provider_id) {
        Some(region) => Box::new(ZaiTokenStore::new(region)),
        None => Box::new(KeychainCredentials::for_provider(provider_id)),
    }
}

// ============================================================================
// Tests
// ============================================================================
