//! Transient user-facing messages raised by mutations.
//!
//! Views accept an `Arc<dyn ToastSink>`; the CLI logs toasts, tests capture
//! them.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

pub trait ToastSink: Send + Sync {
    fn show(&self, toast: Toast);
}

/// Writes toasts to the log.
pub struct LogToasts;

impl ToastSink for LogToasts {
    fn show(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Success => info!(toast = %toast.message, "Success"),
            ToastKind::Error => warn!(toast = %toast.message, "Error"),
        }
    }
}

/// Keeps every toast in memory, in order.
#[derive(Default)]
pub struct CaptureToasts {
    toasts: Mutex<Vec<Toast>>,
}

impl CaptureToasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts.lock().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.toasts.lock().len()
    }

    pub fn clear(&self) {
        self.toasts.lock().clear();
    }
}

impl ToastSink for CaptureToasts {
    fn show(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}
