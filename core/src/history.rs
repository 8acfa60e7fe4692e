//! Dual-backed request history.
//!
//! # Design
//! The local log is authoritative for "most recent first": every `record`
//! prepends to it synchronously, truncates it to the cap and persists it.
//! Persistence failures are logged and swallowed; the in-memory log still
//! reflects the write for the rest of the session.
//!
//! When the entry carries a `user_id`, a remote append is spawned on the
//! current tokio runtime and not awaited. Its failure is reported through the
//! `Notifier` and nothing else: no retry, no queue. `flush` exists so callers
//! (tests, shutdown) can wait for outstanding remote writes.
//!
//! Reads from the remote service degrade to an empty list on any failure.
//! The two logs are never merged.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::builder::RequestBuilder;
use crate::context::Context;
use crate::error::{HistoryError, StorageError};
use crate::notify::Severity;
use crate::storage::{LocalStore, HISTORY_KEY, LOAD_REQUEST_KEY};
use crate::types::HistoryEntry;

pub const REMOTE_SAVE_FAILED: &str = "Failed to save history to server";
pub const REMOTE_LOAD_FAILED: &str = "Failed to load history from server";

pub struct HistoryStore {
    ctx: Context,
    store: Arc<dyn LocalStore>,
    limit: usize,
    entries: Mutex<Vec<HistoryEntry>>,
    load_slot: LoadSlot,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl HistoryStore {
    /// Open the store, restoring the local log persisted under `history`.
    pub fn open(ctx: Context, store: Arc<dyn LocalStore>, limit: usize) -> Self {
        let mut entries = match load_log(store.as_ref()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable local history");
                Vec::new()
            }
        };
        entries.truncate(limit);

        Self {
            ctx,
            load_slot: LoadSlot::new(Arc::clone(&store)),
            store,
            limit,
            entries: Mutex::new(entries),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Append `entry`. Never fails and never waits on the network.
    pub fn record(&self, entry: HistoryEntry) {
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.insert(0, entry.clone());
            entries.truncate(self.limit);
            self.persist(&entries);
        }

        if let Some(user_id) = entry.user_id.clone() {
            self.spawn_remote_save(entry, user_id);
        }
    }

    /// `None` lists the local log; `Some(user)` fetches the remote log.
    pub async fn list(&self, user_id: Option<&str>) -> Vec<HistoryEntry> {
        let Some(user_id) = user_id else {
            return self.local();
        };
        match self.fetch_remote(user_id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "remote history unavailable");
                self.ctx.notifier.notify(REMOTE_LOAD_FAILED, Severity::Error);
                Vec::new()
            }
        }
    }

    /// Snapshot of the local log, newest first.
    pub fn local(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get(&self, index: usize) -> Option<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        self.persist(&entries);
    }

    /// Remove the entry at `index`; out of range is a no-op.
    pub fn remove(&self, index: usize) -> Option<HistoryEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if index >= entries.len() {
            return None;
        }
        let removed = entries.remove(index);
        self.persist(&entries);
        Some(removed)
    }

    pub fn load_slot(&self) -> &LoadSlot {
        &self.load_slot
    }

    /// Hand `entry` to the builder through the load slot.
    ///
    /// The token is written first and then consumed by the builder's
    /// re-initialization, so a restart in between still delivers it once.
    pub fn load_into_builder(&self, entry: &HistoryEntry, builder: &mut RequestBuilder) {
        self.load_slot.put(entry);
        builder.initialize(&self.load_slot);
    }

    /// Wait for every remote write spawned so far.
    pub async fn flush(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "remote history task aborted");
            }
        }
    }

    fn persist(&self, entries: &[HistoryEntry]) {
        let result = serde_json::to_string(entries)
            .map_err(|e| StorageError::Corrupt {
                key: HISTORY_KEY.to_string(),
                reason: e.to_string(),
            })
            .and_then(|json| self.store.write(HISTORY_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "local history not persisted");
        }
    }

    fn spawn_remote_save(&self, entry: HistoryEntry, user_id: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime; remote history write skipped");
            return;
        };

        let client = self.ctx.client.clone();
        let transport = Arc::clone(&self.ctx.transport);
        let notifier = Arc::clone(&self.ctx.notifier);
        let token = self.ctx.session.current_token();

        let handle = runtime.spawn(async move {
            let request = client.build_save_history(&entry, &user_id, token.as_deref());
            let result = match transport.send(request).await {
                Ok(response) => client.parse_save_history(response),
                Err(e) => Err(HistoryError::from(e)),
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, user_id = %user_id, "remote history write failed");
                notifier.notify(REMOTE_SAVE_FAILED, Severity::Error);
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    async fn fetch_remote(&self, user_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let token = self.ctx.session.current_token();
        let request = self.ctx.client.build_fetch_history(user_id, token.as_deref());
        let response = self.ctx.transport.send(request).await?;
        self.ctx.client.parse_fetch_history(response)
    }
}

fn load_log(store: &dyn LocalStore) -> Result<Vec<HistoryEntry>, StorageError> {
    let Some(raw) = store.read(HISTORY_KEY)? else {
        return Ok(Vec::new());
    };
    serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
        key: HISTORY_KEY.to_string(),
        reason: e.to_string(),
    })
}

/// Single-slot handoff of a history entry to the next builder initialization.
///
/// The token lives in memory and under `load-request` in the local store;
/// writing a new one replaces any unconsumed token and `take` clears both.
/// Once this slot has handed a token out, the stored copy is ignored until
/// the next `put`, even if the store refused to delete it. An empty stored
/// value counts as no token.
pub struct LoadSlot {
    store: Arc<dyn LocalStore>,
    state: Mutex<SlotState>,
}

enum SlotState {
    /// Nothing put or taken yet; a token may be left over from a previous run.
    Unknown,
    Pending(HistoryEntry),
    Consumed,
}

impl LoadSlot {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SlotState::Unknown),
        }
    }

    pub fn put(&self, entry: &HistoryEntry) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = SlotState::Pending(entry.clone());
        let result = serde_json::to_string(entry)
            .map_err(|e| StorageError::Corrupt {
                key: LOAD_REQUEST_KEY.to_string(),
                reason: e.to_string(),
            })
            .and_then(|json| self.store.write(LOAD_REQUEST_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "load token kept in memory only");
        }
    }

    /// Consume the pending token, if any. A second call returns `None`.
    pub fn take(&self) -> Option<HistoryEntry> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = match std::mem::replace(&mut *state, SlotState::Consumed) {
            SlotState::Consumed => return None,
            SlotState::Pending(entry) => Some(entry),
            SlotState::Unknown => self.read_stored(),
        };
        self.clear_stored();
        entry
    }

    pub fn is_pending(&self) -> bool {
        match &*self.state.lock().unwrap_or_else(|e| e.into_inner()) {
            SlotState::Pending(_) => true,
            SlotState::Consumed => false,
            SlotState::Unknown => matches!(
                self.store.read(LOAD_REQUEST_KEY),
                Ok(Some(raw)) if !raw.trim().is_empty()
            ),
        }
    }

    fn read_stored(&self) -> Option<HistoryEntry> {
        let raw = match self.store.read(LOAD_REQUEST_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "load token unreadable");
                return None;
            }
        };
        if raw.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt load token");
                None
            }
        }
    }

    /// Delete the stored copy, or blank it when the store refuses to delete.
    fn clear_stored(&self) {
        let Err(e) = self.store.remove(LOAD_REQUEST_KEY) else {
            return;
        };
        tracing::warn!(error = %e, "load token not removed; blanking it");
        if let Err(e) = self.store.write(LOAD_REQUEST_KEY, "") {
            tracing::warn!(error = %e, "stale load token left in store");
        }
    }
}
