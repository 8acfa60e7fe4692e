//! Stateless request builder and response parser for the workbench backend.
//!
//! # Design
//! `BackendClient` holds only a `base_url` and carries no mutable state
//! between calls. Each backend operation is split into a `build_*` method
//! that produces an `HttpRequest` and a `parse_*` method that consumes the
//! transport outcome. Executing the round-trip is left to a `Transport`, so
//! request shaping and outcome classification stay deterministic.
//!
//! The bearer token is passed per call rather than stored: the session may
//! change between two requests.

use serde_json::{json, Value};

use crate::error::{DispatchError, HistoryError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::bearer_header;
use crate::types::{HeaderMap, HistoryEntry, ResponseData, ResponseRecord};

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/test-request`: ask the backend to perform the user's request.
    pub fn build_forward(
        &self,
        url: &str,
        method: HttpMethod,
        headers: &HeaderMap,
        body: &Value,
        token: Option<&str>,
    ) -> HttpRequest {
        let payload = json!({
            "url": url,
            "method": method,
            "headers": headers,
            "body": body,
        });
        HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/api/test-request", self.base_url),
            headers: json_headers(token),
            body: Some(payload.to_string()),
        }
    }

    /// Classify the forwarding outcome into the record shown to the user.
    pub fn parse_forward(
        &self,
        outcome: Result<HttpResponse, TransportError>,
        elapsed_ms: f64,
    ) -> ResponseRecord {
        let response = match outcome {
            Ok(response) => response,
            Err(TransportError::Timeout) => return ResponseRecord::Failure(DispatchError::Timeout),
            Err(TransportError::Unreachable(_)) => {
                return ResponseRecord::Failure(DispatchError::NetworkUnreachable)
            }
        };
        if !response.is_success() {
            return ResponseRecord::Failure(DispatchError::Http {
                code: response.status,
                status_text: response.status_text,
            });
        }

        let mut headers = HeaderMap::new();
        for (name, value) in response.headers {
            headers
                .entry(name)
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        let data = serde_json::from_str(&response.body).unwrap_or(Value::String(response.body));

        ResponseRecord::Success(ResponseData {
            status: response.status,
            headers,
            data,
            elapsed_ms,
        })
    }

    /// `POST /history/save` for a logged-in user.
    pub fn build_save_history(
        &self,
        entry: &HistoryEntry,
        user_id: &str,
        token: Option<&str>,
    ) -> HttpRequest {
        let payload = json!({
            "url": entry.url,
            "method": entry.method,
            "headers": entry.headers,
            "body": entry.body,
            "time": entry.saved_at,
            "user_id": user_id,
        });
        HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/history/save", self.base_url),
            headers: json_headers(token),
            body: Some(payload.to_string()),
        }
    }

    pub fn parse_save_history(&self, response: HttpResponse) -> Result<(), HistoryError> {
        check_status(&response)
    }

    /// `GET /history/get?user_id=...`.
    pub fn build_fetch_history(&self, user_id: &str, token: Option<&str>) -> HttpRequest {
        let encoded: String = url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect();
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/history/get?user_id={encoded}", self.base_url),
            headers: bearer_header(token).into_iter().collect(),
            body: None,
        }
    }

    /// Decode a history listing. Items that cannot be read as entries are
    /// skipped with a warning; the rest keep the server's order.
    pub fn parse_fetch_history(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        check_status(&response)?;
        let payload: Value = serde_json::from_str(&response.body)?;
        let items = normalize_history_payload(payload)?;

        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<HistoryEntry>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable history item");
                    None
                }
            })
            .collect())
    }
}

/// Accept a bare list, `{data: [...]}` or `{history: [...]}`.
pub fn normalize_history_payload(payload: Value) -> Result<Vec<Value>, HistoryError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => {
            for key in ["data", "history"] {
                if let Some(Value::Array(items)) = object.remove(key) {
                    return Ok(items);
                }
            }
            let keys: Vec<&str> = object.keys().map(String::as_str).collect();
            Err(HistoryError::UnexpectedShape(format!("object with keys {keys:?}")))
        }
        other => Err(HistoryError::UnexpectedShape(other.to_string())),
    }
}

fn json_headers(token: Option<&str>) -> Vec<(String, String)> {
    let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
    headers.extend(bearer_header(token));
    headers
}

fn check_status(response: &HttpResponse) -> Result<(), HistoryError> {
    if response.is_success() {
        return Ok(());
    }
    Err(HistoryError::Status {
        status: response.status,
        body: response.body.clone(),
    })
}
