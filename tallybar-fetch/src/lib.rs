// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # TallyBar Fetch
//!
//! The provider abstraction and the host APIs providers need.
//!
//! ## Provider Abstraction
//!
//! - [`provider::UsageProvider`] - One backend: fetch + error classification
//! - [`error::ProviderError`] - Failure taxonomy shared by all providers
//! - [`backoff::BackoffPolicy`] - Backoff factor and delay arithmetic
//!
//! ## Host APIs
//!
//! - [`host::credentials`] - API key storage
//! - [`host::http`] - HTTP client with a bounded timeout
//!
//! ## Example
//!
//! ```ignore
//! use tallybar_fetch::{CredentialStore, KeychainCredentials, UsageProvider};
//!
//! let credentials = KeychainCredentials::for_provider(provider.id());
//! let key = credentials.read().await?.ok_or(MissingKey)?;
//! match provider.fetch(&key).await {
//!     Ok(snapshot) => println!("{}%", snapshot.primary_pct().unwrap_or(0)),
//!     Err(e) => println!("{:?}", provider.classify_error(&e).action),
//! }
//! ```

pub mod backoff;
pub mod error;
pub mod host;
pub mod provider;

// Errors
pub use error::{KeychainError, ProviderError};

// Host APIs
pub use host::{
    credentials::{CredentialStore, EnvCredentials, KeychainCredentials, MemoryCredentials},
    http::HttpClient,
};

// Provider abstraction
pub use backoff::BackoffPolicy;
pub use provider::{classify_provider_error, UsageProvider, DEFAULT_RESET_INTERVAL_SECS};
