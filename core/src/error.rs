//! Error types for the workbench core.
//!
//! # Design
//! `DispatchError` is the user-facing taxonomy: its `Display` output is the
//! exact message shown in the response area. Client-side validation failures
//! get their own variants because they block dispatch before any network I/O
//! and never produce a history entry. The remaining variants are reached only
//! after a request went out, and every one of them is recorded to history.
//!
//! History and storage errors never reach the request/response flow; they are
//! logged, and remote failures are additionally surfaced through a `Notifier`.

use thiserror::Error;

/// Outcome classification for a failed dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The URL is not an absolute URL with a scheme and authority.
    #[error("Invalid URL format")]
    InvalidUrl,

    /// A non-GET request carries a non-blank body that is not valid JSON.
    #[error("Invalid JSON format in request body")]
    InvalidBody,

    /// The backend answered with a non-2xx status.
    #[error("HTTP {code}: {status_text}")]
    Http { code: u16, status_text: String },

    /// No response within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Any other transport failure (DNS, connection refused, TLS, ...).
    #[error("Network Error: Unable to reach server")]
    NetworkUnreachable,
}

impl DispatchError {
    /// True for failures caught before any network I/O.
    pub fn is_client_validation(&self) -> bool {
        matches!(self, DispatchError::InvalidUrl | DispatchError::InvalidBody)
    }
}

/// Failures raised by a `Transport` while executing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("unreachable: {0}")]
    Unreachable(String),
}

/// Failures talking to the remote history service.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("history service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The payload was JSON but not one of the accepted list shapes.
    #[error("unexpected history payload: {0}")]
    UnexpectedShape(String),

    #[error("history payload is not JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures of the durable local store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value under `{key}` is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Failures while wiring a `Workbench` from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("cannot build HTTP client: {0}")]
    Transport(#[from] TransportError),
}
