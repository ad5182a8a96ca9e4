// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # TallyBar Store
//!
//! Scheduling, persistence, and notification for TallyBar.
//!
//! This crate provides:
//!
//! - **FetchEngine**: Run state, backoff, and the snapshot cache
//! - **FetchLoop**: Background task driving the engine's schedule
//! - **ResetNotifier**: Announces quota resets once per period
//! - **Persistence**: Atomic JSON documents with secure permissions
//! - **Config**: User configuration with per-field defaults
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tallybar_store::{FetchEngine, FetchLoop, FileDocumentStore};
//!
//! let engine = Arc::new(
//!     FetchEngine::builder(provider, credentials, Arc::new(FileDocumentStore::default_location()))
//!         .open()
//!         .await?,
//! );
//!
//! let snapshot = engine.fetch_if_due().await?;
//!
//! let (tx, rx) = tokio::sync::watch::channel(false);
//! tokio::spawn(async move { FetchLoop::new(engine).run(rx).await });
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod notifier;
pub mod persistence;
pub mod reset_notifier;
pub mod run_loop;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::{EngineBuilder, EngineSettings, FetchEngine};
pub use error::{EngineError, NotifyError, StoreError};
pub use notifier::{DesktopNotifier, Notifier, RecordingNotifier};
pub use persistence::{
    default_config_dir, default_config_path, default_data_dir, load_document, load_json,
    save_document, save_json,
    DocumentStore, FileDocumentStore, MemoryDocumentStore, RUN_STATE_DOC, SNAPSHOT_DOC,
};
pub use reset_notifier::{ResetNotifier, TickOutcome};
pub use run_loop::FetchLoop;

#[cfg(test)]
mod testing;
