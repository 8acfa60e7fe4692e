//! Test doubles shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::BackendClient;
use crate::context::Context;
use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::notify::{Notifier, Severity};
use crate::session::Session;
use crate::transport::Transport;
use crate::types::User;

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Records every request and answers with a canned outcome.
pub(crate) struct FakeTransport {
    calls: Mutex<Vec<HttpRequest>>,
    responder: Box<Responder>,
}

impl FakeTransport {
    pub(crate) fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Answers every request with `status` and a JSON `body`.
    pub(crate) fn answering(status: u16, body: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(response(status, body)))
    }

    pub(crate) fn failing(err: TransportError) -> Arc<Self> {
        Self::new(move |_| Err(err.clone()))
    }

    pub(crate) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|r| r.url.contains(path)).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let outcome = (self.responder)(&request);
        self.calls.lock().unwrap().push(request);
        outcome
    }
}

pub(crate) fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        status_text: if status == 200 { "OK" } else { "Error" }.to_string(),
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    }
}

#[derive(Default)]
pub(crate) struct CollectingNotifier {
    seen: Mutex<Vec<(String, Severity)>>,
}

impl CollectingNotifier {
    pub(crate) fn messages(&self) -> Vec<(String, Severity)> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.seen.lock().unwrap().push((message.to_string(), severity));
    }
}

pub(crate) fn alice() -> User {
    User {
        id: "u-1".to_string(),
        email: "alice@example.com".to_string(),
    }
}

pub(crate) struct Harness {
    pub ctx: Context,
    pub session: Arc<Session>,
    pub notifier: Arc<CollectingNotifier>,
}

pub(crate) fn harness(transport: Arc<FakeTransport>) -> Harness {
    let session = Arc::new(Session::new());
    let notifier = Arc::new(CollectingNotifier::default());
    let ctx = Context::new(
        BackendClient::new("http://backend.test"),
        transport,
        session.clone(),
        notifier.clone(),
    );
    Harness {
        ctx,
        session,
        notifier,
    }
}
