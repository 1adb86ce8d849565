//! Transient user notifications ("toasts").
//!
//! Form sessions never fail loudly: every outcome is reported through a
//! [`Notifier`]. A UI binds one that renders toasts; the CLI uses
//! [`TracingNotifier`]; tests use [`ToastLog`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastLevel {
    Success,
    Error,
    Info,
}

/// A single transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    /// How long the toast stays visible.
    pub auto_close: Duration,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>, auto_close: Duration) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
            auto_close,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>, auto_close: Duration) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
            auto_close,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>, auto_close: Duration) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
            auto_close,
        }
    }
}

/// Sink for toasts.
pub trait Notifier: Send + Sync {
    /// Show a toast.
    fn notify(&self, toast: Toast);

    /// Dismiss every visible toast.
    fn dismiss_all(&self);
}

/// Writes toasts as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Success => tracing::info!(toast = "success", "{}", toast.message),
            ToastLevel::Info => tracing::info!(toast = "info", "{}", toast.message),
            ToastLevel::Error => tracing::error!(toast = "error", "{}", toast.message),
        }
    }

    fn dismiss_all(&self) {}
}

/// Keeps the visible toasts in memory, newest last.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct ToastLog {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl ToastLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the visible toasts.
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|toasts| toasts.clone())
            .unwrap_or_default()
    }

    /// The most recent toast.
    #[must_use]
    pub fn last(&self) -> Option<Toast> {
        self.toasts().pop()
    }

    /// Messages of the visible toasts at `level`.
    #[must_use]
    pub fn messages(&self, level: ToastLevel) -> Vec<String> {
        self.toasts()
            .into_iter()
            .filter(|toast| toast.level == level)
            .map(|toast| toast.message)
            .collect()
    }
}

impl Notifier for ToastLog {
    fn notify(&self, toast: Toast) {
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.push(toast);
        }
    }

    fn dismiss_all(&self) {
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.clear();
        }
    }
}
