//! Timed dispatch with failure classification.
//!
//! # Design
//! One `dispatch` call runs strictly in order: validate the URL, fold the
//! headers, gate the body, forward through the backend, time the round-trip,
//! classify, then record exactly one history entry. The two validation gates
//! return before any I/O and before history is touched. Separate calls are
//! independent and may complete in any order.

use std::sync::Arc;
use std::time::Instant;

use crate::context::Context;
use crate::error::DispatchError;
use crate::history::HistoryStore;
use crate::types::{HistoryEntry, RequestDescriptor, ResponseRecord};
use crate::validate::{is_valid_url, parse_body_or_fail, to_header_map};

pub struct Dispatcher {
    ctx: Context,
    history: Arc<HistoryStore>,
}

impl Dispatcher {
    pub fn new(ctx: Context, history: Arc<HistoryStore>) -> Self {
        Self { ctx, history }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub async fn dispatch(&self, descriptor: &RequestDescriptor) -> ResponseRecord {
        if !is_valid_url(&descriptor.url) {
            tracing::debug!(url = %descriptor.url, "rejected: invalid url");
            return ResponseRecord::Failure(DispatchError::InvalidUrl);
        }
        let headers = to_header_map(&descriptor.headers);
        let body = match parse_body_or_fail(&descriptor.body, descriptor.method) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(url = %descriptor.url, "rejected: invalid body");
                return ResponseRecord::Failure(e);
            }
        };

        let token = self.ctx.session.current_token();
        let request = self.ctx.client.build_forward(
            &descriptor.url,
            descriptor.method,
            &headers,
            &body,
            token.as_deref(),
        );

        let started = Instant::now();
        let outcome = self.ctx.transport.send(request).await;
        let elapsed_ms = round_ms(started.elapsed().as_secs_f64() * 1000.0);

        let record = self.ctx.client.parse_forward(outcome, elapsed_ms);
        match &record {
            ResponseRecord::Success(data) => tracing::info!(
                method = %descriptor.method,
                url = %descriptor.url,
                status = data.status,
                elapsed_ms,
                "dispatch complete"
            ),
            ResponseRecord::Failure(e) => tracing::info!(
                method = %descriptor.method,
                url = %descriptor.url,
                error = %e,
                "dispatch failed"
            ),
        }

        let user_id = self.ctx.session.current_user().map(|u| u.id);
        self.history.record(HistoryEntry::capture(descriptor, user_id));
        record
    }
}

/// Round to 2 decimals.
fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::error::TransportError;
    use crate::http::HttpMethod;
    use crate::storage::MemoryStore;
    use crate::testing::{alice, harness, response, FakeTransport, Harness};
    use crate::types::HeaderPair;

    fn setup(transport: Arc<FakeTransport>) -> (Dispatcher, Harness) {
        let h = harness(transport);
        let history = Arc::new(HistoryStore::open(h.ctx.clone(), Arc::new(MemoryStore::new()), 50));
        (Dispatcher::new(h.ctx.clone(), history), h)
    }

    fn request(url: &str, method: HttpMethod, body: &str) -> RequestDescriptor {
        RequestDescriptor {
            url: url.to_string(),
            method,
            headers: vec![
                HeaderPair::new("Accept", "text/plain"),
                HeaderPair::new(" ", "dropped"),
                HeaderPair::new("Accept", "application/json"),
            ],
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn invalid_url_never_reaches_network_or_history() {
        let transport = FakeTransport::answering(200, "{}");
        let (dispatcher, _h) = setup(transport.clone());

        for url in ["", "example.com/ok", "/relative", "::::"] {
            let record = dispatcher.dispatch(&request(url, HttpMethod::Get, "")).await;
            assert_eq!(record, ResponseRecord::Failure(DispatchError::InvalidUrl), "{url}");
        }
        assert!(transport.calls().is_empty());
        assert!(dispatcher.history().is_empty());
    }

    #[tokio::test]
    async fn invalid_body_never_reaches_network_or_history() {
        let transport = FakeTransport::answering(200, "{}");
        let (dispatcher, _h) = setup(transport.clone());

        let record = dispatcher
            .dispatch(&request("https://example.com/ok", HttpMethod::Post, "not json"))
            .await;
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"error": true, "message": "Invalid JSON format in request body"})
        );
        assert!(transport.calls().is_empty());
        assert!(dispatcher.history().is_empty());
    }

    #[tokio::test]
    async fn get_ignores_body_entirely() {
        let transport = FakeTransport::answering(200, r#"{"ok":true}"#);
        let (dispatcher, _h) = setup(transport.clone());

        let record = dispatcher
            .dispatch(&request("https://example.com/ok", HttpMethod::Get, "not json"))
            .await;
        assert_eq!(record.status(), Some(200));

        let sent: Value = serde_json::from_str(transport.calls()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["body"], json!({}));
        assert_eq!(sent["headers"], json!({"Accept": "application/json"}));
        assert_eq!(sent["method"], "GET");
    }

    #[tokio::test]
    async fn success_records_one_entry() {
        let transport = FakeTransport::answering(200, r#"{"ok":true}"#);
        let (dispatcher, _h) = setup(transport);

        let record = dispatcher
            .dispatch(&request("https://example.com/ok", HttpMethod::Get, ""))
            .await;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], 200);
        assert_eq!(json["data"], json!({"ok": true}));
        assert!(json["time"].as_str().unwrap().parse::<f64>().unwrap() >= 0.0);

        let local = dispatcher.history().local();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].method, HttpMethod::Get);
        assert!(local[0].user_id.is_none());
    }

    #[tokio::test]
    async fn every_post_validation_failure_is_recorded() {
        let cases = [
            (
                FakeTransport::new(|_| {
                    let mut r = response(503, "{}");
                    r.status_text = "Service Unavailable".to_string();
                    Ok(r)
                }),
                "HTTP 503: Service Unavailable",
            ),
            (FakeTransport::failing(TransportError::Timeout), "Request timed out"),
            (
                FakeTransport::failing(TransportError::Unreachable("refused".to_string())),
                "Network Error: Unable to reach server",
            ),
        ];
        for (transport, message) in cases {
            let (dispatcher, _h) = setup(transport);
            let record = dispatcher
                .dispatch(&request("https://example.com/ok", HttpMethod::Delete, ""))
                .await;
            assert_eq!(record.message().as_deref(), Some(message));
            assert_eq!(dispatcher.history().len(), 1, "{message}");
        }
    }

    #[tokio::test]
    async fn session_is_read_at_call_time() {
        let transport = FakeTransport::answering(200, "{}");
        let (dispatcher, h) = setup(transport.clone());
        let desc = request("https://example.com/ok", HttpMethod::Get, "");

        dispatcher.dispatch(&desc).await;
        h.session.login(alice(), "tok");
        dispatcher.dispatch(&desc).await;
        dispatcher.history().flush().await;
        h.session.logout();
        dispatcher.dispatch(&desc).await;

        let forwards: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|r| r.url.ends_with("/api/test-request"))
            .collect();
        assert_eq!(forwards.len(), 3);
        assert_eq!(forwards[0].header("authorization"), None);
        assert_eq!(forwards[1].header("authorization"), Some("Bearer tok"));
        assert_eq!(forwards[2].header("authorization"), None);
        assert_eq!(transport.calls_to("/history/save"), 1);

        let users: Vec<Option<String>> = dispatcher
            .history()
            .local()
            .into_iter()
            .map(|e| e.user_id)
            .collect();
        assert_eq!(users, vec![None, Some("u-1".to_string()), None]);
    }

    #[tokio::test]
    async fn local_history_is_min_of_n_and_cap() {
        let transport = FakeTransport::answering(200, "{}");
        let (dispatcher, _h) = setup(transport);
        for i in 0..55 {
            let desc = request(&format!("https://example.com/{i}"), HttpMethod::Get, "");
            dispatcher.dispatch(&desc).await;
        }
        let local = dispatcher.history().local();
        assert_eq!(local.len(), 50);
        assert_eq!(local[0].url, "https://example.com/54");
    }

    #[test]
    fn latency_rounds_to_two_decimals() {
        assert_eq!(round_ms(12.3456), 12.35);
        assert_eq!(round_ms(0.004), 0.0);
    }
}
