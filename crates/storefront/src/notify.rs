//! Transient user notifications (toasts).
//!
//! Controllers report the outcome of user actions here. Nothing is kept;
//! a notice that no one is subscribed to is simply dropped.

use tokio::sync::broadcast;

use crate::error::AppError;

/// Notices buffered per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 64;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Broadcasts notices to every subscribed front-end.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Receive notices sent from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(%message, "notice");
        self.publish(NoticeLevel::Success, message);
    }

    /// Success notice with the backend's message, or `fallback` when the
    /// backend sent none.
    pub fn success_or(&self, message: String, fallback: &str) {
        if message.trim().is_empty() {
            self.success(fallback);
        } else {
            self.success(message);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(%message, "notice");
        self.publish(NoticeLevel::Info, message);
    }

    /// Report a failed action to the user.
    ///
    /// Internal failures are also captured to Sentry.
    pub fn error(&self, err: &AppError) {
        let message = err.user_message();
        if err.is_internal() {
            err.report();
        } else {
            tracing::warn!(error = %err, %message, "action failed");
        }
        self.publish(NoticeLevel::Error, message);
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        // No subscribers is fine
        let _ = self.tx.send(Notice { level, message });
    }
}
