//! User-facing notifications.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::NotifyError;

/// Delivers one-line notifications to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns true if the user allows notifications.
    fn is_authorized(&self) -> bool;

    /// Shows one notification.
    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

// ============================================================================
// Desktop Notifier
// ============================================================================

/// System notification center on macOS; a log line elsewhere.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    /// Creates a notifier. A disabled notifier is never authorized.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

/// Escapes text for an AppleScript string literal.
fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', " ")
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn is_authorized(&self) -> bool {
        self.enabled
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if !self.enabled {
            return Err(NotifyError::NotAuthorized);
        }

        info!(title, body, "Sending notification");

        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                escape_applescript(body),
                escape_applescript(title)
            );

            let output = tokio::process::Command::new("osascript")
                .args(["-e", &script])
                .output()
                .await
                .map_err(|e| NotifyError::Delivery(e.to_string()))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(NotifyError::Delivery(stderr.trim().to_string()));
            }
        }

        debug!("Notification delivered");
        Ok(())
    }
}

// ============================================================================
// Recording Notifier
// ============================================================================

/// Notifier that records what it was asked to send.
#[derive(Debug)]
pub struct RecordingNotifier {
    authorized: AtomicBool,
    fail: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self {
            authorized: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingNotifier {
    /// Creates an authorized notifier that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants or revokes authorization.
    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    /// Makes subsequent sends fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns every `(title, body)` delivered so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("simulated failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}
