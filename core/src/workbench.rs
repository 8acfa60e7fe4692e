//! Orchestration of builder, dispatch engine and history.
//!
//! The presentation layer drives a `Workbench` through plain method calls
//! and observes the response area through a `watch` subscription.

use std::sync::Arc;

use tokio::sync::watch;

use crate::builder::RequestBuilder;
use crate::config::WorkbenchConfig;
use crate::context::Context;
use crate::dispatch::Dispatcher;
use crate::error::SetupError;
use crate::history::HistoryStore;
use crate::notify::Notifier;
use crate::session::SessionProvider;
use crate::storage::{FileStore, LocalStore};
use crate::types::{HistoryEntry, ResponseRecord};

pub struct Workbench {
    ctx: Context,
    builder: RequestBuilder,
    dispatcher: Dispatcher,
    history: Arc<HistoryStore>,
    response: watch::Sender<Option<ResponseRecord>>,
}

impl Workbench {
    /// Wire the components. The builder is initialized immediately, so a
    /// load token left by a previous run is consumed here.
    pub fn new(ctx: Context, store: Arc<dyn LocalStore>, history_limit: usize) -> Self {
        let history = Arc::new(HistoryStore::open(ctx.clone(), store, history_limit));
        let builder = RequestBuilder::from_slot(history.load_slot());
        let dispatcher = Dispatcher::new(ctx.clone(), Arc::clone(&history));
        let (response, _) = watch::channel(None);
        Self {
            ctx,
            builder,
            dispatcher,
            history,
            response,
        }
    }

    /// Network transport and a file-backed store under `config.data_dir`.
    pub fn from_config(
        config: &WorkbenchConfig,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SetupError> {
        let ctx = Context::from_config(config, session, notifier)?;
        let store = FileStore::open(&config.data_dir)?;
        tracing::info!(api_url = %config.api_url, data_dir = %config.data_dir.display(), "workbench ready");
        Ok(Self::new(ctx, Arc::new(store), config.history_limit))
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut RequestBuilder {
        &mut self.builder
    }

    /// Dispatch the current form and publish the outcome.
    pub async fn send(&mut self) -> ResponseRecord {
        self.builder.set_loading(true);
        let descriptor = self.builder.descriptor();
        let record = self.dispatcher.dispatch(&descriptor).await;
        self.builder.set_loading(false);
        self.response.send_replace(Some(record.clone()));
        record
    }

    /// Receives every published response; `None` means the area is empty.
    pub fn subscribe(&self) -> watch::Receiver<Option<ResponseRecord>> {
        self.response.subscribe()
    }

    pub fn response(&self) -> Option<ResponseRecord> {
        self.response.borrow().clone()
    }

    pub fn clear_response(&self) {
        self.response.send_replace(None);
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Load the local entry at `index` into the builder.
    pub fn load_from_history(&mut self, index: usize) -> bool {
        match self.history.get(index) {
            Some(entry) => {
                self.history.load_into_builder(&entry, &mut self.builder);
                true
            }
            None => false,
        }
    }

    /// Load any entry, e.g. one listed from the remote log.
    pub fn load_entry(&mut self, entry: &HistoryEntry) {
        self.history.load_into_builder(entry, &mut self.builder);
    }

    pub fn delete_history(&self, index: usize) -> Option<HistoryEntry> {
        self.history.remove(index)
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    /// Remote log for a logged-in user, local log otherwise.
    pub async fn history_view(&self) -> Vec<HistoryEntry> {
        let user = self.ctx.session.current_user();
        self.history.list(user.as_ref().map(|u| u.id.as_str())).await
    }

    /// Wait for outstanding remote history writes.
    pub async fn shutdown(&self) {
        self.history.flush().await;
    }
}
