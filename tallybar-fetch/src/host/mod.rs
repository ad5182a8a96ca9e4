//! Host APIs for TallyBar providers.
//!
//! - [`credentials`] - API key storage (system keychain, environment, memory)
//! - [`http`] - Single-attempt HTTP client with status mapping

pub mod credentials;
pub mod http;

pub use credentials::{CredentialStore, EnvCredentials, KeychainCredentials, MemoryCredentials};
pub use http::HttpClient;
