//! API key storage.
//!
//! The engine reads its API key through [`CredentialStore`]. Implementations:
//! - [`KeychainCredentials`] - the system keychain (macOS Keychain, Windows
//!   Credential Manager, Linux Secret Service)
//! - [`EnvCredentials`] - a read-only environment variable
//! - [`MemoryCredentials`] - in-process, for tests and embedding

use std::sync::Mutex;

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::error::KeychainError;

/// Service name prefix for TallyBar credentials.
const SERVICE_PREFIX: &str = "tallybar";

/// Account name used for API keys.
pub const API_KEY_ACCOUNT: &str = "api_key";

// ============================================================================
// Credential Store Trait
// ============================================================================

/// Capability-scoped secret store holding one API key.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads the secret. `Ok(None)` means "not configured".
    async fn read(&self) -> Result<Option<String>, KeychainError>;

    /// Stores the secret, replacing any previous value.
    async fn write(&self, secret: &str) -> Result<(), KeychainError>;

    /// Deletes the secret. Deleting a missing secret succeeds.
    async fn delete(&self) -> Result<(), KeychainError>;

    /// Returns true if a non-empty secret is stored.
    async fn exists(&self) -> bool {
        matches!(self.read().await, Ok(Some(secret)) if !secret.is_empty())
    }
}

// ============================================================================
// System Keychain
// ============================================================================

/// API key stored in the system keychain under `tallybar:<provider>`.
#[derive(Debug, Clone)]
pub struct KeychainCredentials {
    service: String,
    account: String,
}

impl KeychainCredentials {
    /// Creates a store for the given provider id.
    pub fn for_provider(provider_id: &str) -> Self {
        Self {
            service: Self::full_service(provider_id),
            account: API_KEY_ACCOUNT.to_string(),
        }
    }

    /// Builds the full service name with prefix.
    fn full_service(provider_id: &str) -> String {
        format!("{SERVICE_PREFIX}:{provider_id}")
    }

    /// Returns the keychain service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self) -> Result<Entry, KeychainError> {
        Entry::new(&self.service, &self.account).map_err(|e| KeychainError::Platform(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentials {
    async fn read(&self) -> Result<Option<String>, KeychainError> {
        debug!(service = %self.service, "Reading API key from keychain");

        match self.entry()?.get_password() {
            Ok(secret) if secret.trim().is_empty() => Ok(None),
            Ok(secret) => Ok(Some(secret.trim().to_string())),
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "API key not found");
                Ok(None)
            }
            Err(e) => {
                warn!(service = %self.service, error = %e, "Failed to read API key");
                Err(e.into())
            }
        }
    }

    async fn write(&self, secret: &str) -> Result<(), KeychainError> {
        self.entry()?.set_password(secret.trim()).map_err(|e| {
            warn!(service = %self.service, error = %e, "Failed to store API key");
            KeychainError::from(e)
        })?;

        debug!(service = %self.service, "API key stored");
        Ok(())
    }

    async fn delete(&self) -> Result<(), KeychainError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "API key deleted");
                Ok(())
            }
            Err(e) => {
                warn!(service = %self.service, error = %e, "Failed to delete API key");
                Err(e.into())
            }
        }
    }
}

// ============================================================================
// Environment Variable
// ============================================================================

/// Read-only API key taken from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    /// Reads from the named variable.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Returns the variable name.
    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait]
impl CredentialStore for EnvCredentials {
    async fn read(&self) -> Result<Option<String>, KeychainError> {
        Ok(std::env::var(&self.var)
            .ok()
            .map(|value| clean_secret(&value))
            .filter(|value| !value.is_empty()))
    }

    async fn write(&self, _secret: &str) -> Result<(), KeychainError> {
        Err(KeychainError::ReadOnly(format!("set by ${}", self.var)))
    }

    async fn delete(&self) -> Result<(), KeychainError> {
        Err(KeychainError::ReadOnly(format!("set by ${}", self.var)))
    }
}

/// Trims whitespace and one layer of surrounding quotes.
fn clean_secret(value: &str) -> String {
    let trimmed = value.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

// ============================================================================
// In-Memory
// ============================================================================

/// In-process credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    secret: Mutex<Option<String>>,
}

impl MemoryCredentials {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `secret`.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Mutex::new(Some(secret.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, KeychainError> {
        self.secret
            .lock()
            .map_err(|_| KeychainError::Other("credential lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn read(&self) -> Result<Option<String>, KeychainError> {
        Ok(self.lock()?.clone().filter(|s| !s.is_empty()))
    }

    async fn write(&self, secret: &str) -> Result<(), KeychainError> {
        *self.lock()? = Some(secret.to_string());
        Ok(())
    }

    async fn delete(&self) -> Result<(), KeychainError> {
        *self.lock()? = None;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
