//! Request construction, dispatch and history core for an API-testing client.
//!
//! # Overview
//! Users compose a request (URL, method, header rows, body) in a
//! `RequestBuilder`, dispatch it through the backend's forwarding endpoint,
//! and get back a timed `ResponseRecord` or a classified error. Every attempt
//! that passes client-side validation is appended to a `HistoryStore` that
//! keeps a capped local log and, for logged-in users, a best-effort remote log.
//!
//! # Design
//! - `BackendClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes the outcome. A `Transport` does the I/O in between,
//!   so everything but the socket is testable with a fake.
//! - Collaborators (transport, session, notifier) travel in an explicit
//!   `Context` instead of process-wide defaults.
//! - Remote history writes are spawned and never awaited by the dispatch
//!   flow; their failures only reach the `Notifier`.
//! - The builder and the history store hand entries over through a
//!   single-slot `LoadSlot`, consumed exactly once.

pub mod builder;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod http;
pub mod notify;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;
pub mod validate;
pub mod workbench;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::RequestBuilder;
pub use client::BackendClient;
pub use config::WorkbenchConfig;
pub use context::Context;
pub use dispatch::Dispatcher;
pub use error::{DispatchError, HistoryError, SetupError, StorageError, TransportError};
pub use history::{HistoryStore, LoadSlot};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use notify::{Notifier, Severity, ToastQueue};
pub use session::{Session, SessionProvider};
pub use storage::{FileStore, LocalStore, MemoryStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{HeaderMap, HeaderPair, HistoryEntry, RequestDescriptor, ResponseData, ResponseRecord, User};
pub use workbench::Workbench;
