// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # TallyBar Providers
//!
//! Concrete [`UsageProvider`](tallybar_fetch::UsageProvider) implementations
//! and the registry that holds them.
//!
//! ## Supported Providers
//!
//! | Id | Service | Endpoint |
//! |----|---------|----------|
//! | `zai` | z.ai (global) | `https://api.z.ai` |
//! | `bigmodel` | BigModel (mainland China) | `https://open.bigmodel.cn` |
//!
//! ## Usage
//!
//! ```ignore
//! use tallybar_providers::{credential_store, ProviderRegistry};
//!
//! let registry = ProviderRegistry::builtin()?;
//! let provider = registry.get("zai")?;
//! if let Some(key) = credential_store(provider.id()).read().await? {
//!     let snapshot = provider.fetch(&key).await?;
//! }
//! ```

pub mod registry;
pub mod zai;

pub use registry::{credential_store, ProviderRegistry};
pub use zai::{ZaiProvider, ZaiRegion, ZaiTokenStore};
