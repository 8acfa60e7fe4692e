//! Collaborators shared by the dispatch engine and the history store.
//!
//! Passed explicitly to constructors instead of living in process-wide
//! defaults. The session is read on every call, never cached here.

use std::sync::Arc;

use crate::client::BackendClient;
use crate::config::WorkbenchConfig;
use crate::error::TransportError;
use crate::notify::Notifier;
use crate::session::SessionProvider;
use crate::transport::{ReqwestTransport, Transport};

#[derive(Clone)]
pub struct Context {
    pub client: BackendClient,
    pub transport: Arc<dyn Transport>,
    pub session: Arc<dyn SessionProvider>,
    pub notifier: Arc<dyn Notifier>,
}

impl Context {
    pub fn new(
        client: BackendClient,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            transport,
            session,
            notifier,
        }
    }

    /// Real network transport against `config.api_url`.
    pub fn from_config(
        config: &WorkbenchConfig,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(
            BackendClient::new(&config.api_url),
            Arc::new(transport),
            session,
            notifier,
        ))
    }
}
