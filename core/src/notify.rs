//! Fire-and-forget notification sink.
//!
//! `ToastQueue` keeps transient messages that expire a fixed interval after
//! they were posted, independent of later calls. Expired toasts are pruned
//! lazily whenever the queue is read or written.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// How long a toast stays visible.
pub const TOAST_TTL: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Anything that can display a transient `(message, severity)` pair.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ToastQueue {
    ttl: Duration,
    toasts: Mutex<Vec<Toast>>,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::with_ttl(TOAST_TTL)
    }
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            toasts: Mutex::new(Vec::new()),
        }
    }

    /// Unexpired toasts, oldest first.
    pub fn active(&self) -> Vec<Toast> {
        let mut toasts = self.toasts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        toasts.retain(|t| t.expires_at > now);
        toasts.clone()
    }

    /// Close a toast before it expires. Returns false if it was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut toasts = self.toasts.lock().unwrap_or_else(|e| e.into_inner());
        let before = toasts.len();
        toasts.retain(|t| t.id != id);
        toasts.len() != before
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::warn!(%message, "notify"),
            _ => tracing::info!(%message, "notify"),
        }
        let now = Instant::now();
        let mut toasts = self.toasts.lock().unwrap_or_else(|e| e.into_inner());
        toasts.retain(|t| t.expires_at > now);
        toasts.push(Toast {
            id: Uuid::new_v4(),
            message: message.to_string(),
            severity,
            expires_at: now + self.ttl,
        });
    }
}
