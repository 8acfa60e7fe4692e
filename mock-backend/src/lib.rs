//! Stand-in for the workbench backend.
//!
//! Serves the forwarding endpoint, the per-user history service and a few
//! deterministic target routes (`/echo`, `/status/{code}`, `/delay/{ms}`)
//! that forwarded requests can be pointed at.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Response headers that describe the upstream connection, not the payload.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
    "upgrade",
    "proxy-authenticate",
    "trailer",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: Uuid,
    pub url: String,
    pub method: String,
    pub headers: Value,
    pub body: Value,
    pub time: String,
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct SaveHistory {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Value,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub time: String,
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct ForwardRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
}

pub struct BackendState {
    history: RwLock<HashMap<String, Vec<StoredEntry>>>,
    forwarded: AtomicUsize,
    client: reqwest::Client,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            history: RwLock::new(HashMap::new()),
            forwarded: AtomicUsize::new(0),
            client: reqwest::Client::new(),
        }
    }
}

impl BackendState {
    /// Number of calls received on the forwarding endpoint.
    pub fn forwarded(&self) -> usize {
        self.forwarded.load(Ordering::SeqCst)
    }

    /// Stored entries for `user_id`, newest first.
    pub async fn history_for(&self, user_id: &str) -> Vec<StoredEntry> {
        self.history
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

pub type Shared = Arc<BackendState>;

pub fn app() -> Router {
    app_with_state(Arc::new(BackendState::default()))
}

pub fn app_with_state(state: Shared) -> Router {
    Router::new()
        .route("/api/test-request", post(forward))
        .route("/history/save", post(save_history))
        .route("/history/get", get(get_history))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/delay/{ms}", any(delay))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, Arc::new(BackendState::default())).await
}

pub async fn run_with_state(listener: TcpListener, state: Shared) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": true, "message": message.into() }))).into_response()
}

async fn forward(State(state): State<Shared>, Json(input): Json<ForwardRequest>) -> Response {
    state.forwarded.fetch_add(1, Ordering::SeqCst);
    tracing::info!(method = %input.method, url = %input.url, "forwarding");

    let method = match reqwest::Method::from_bytes(input.method.to_ascii_uppercase().as_bytes()) {
        Ok(m) => m,
        Err(_) => return error_body(StatusCode::BAD_REQUEST, "unsupported method"),
    };
    let sends_body = method != reqwest::Method::GET && method != reqwest::Method::HEAD;

    let mut request = state.client.request(method, &input.url);
    for (name, value) in &input.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if sends_body {
        let has_content_type = input
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            request = request.header("content-type", "application/json");
        }
        request = request.body(input.body.to_string());
    }

    let upstream = match request.send().await {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::warn!(url = %input.url, error = %e, "upstream unreachable");
            return error_body(StatusCode::BAD_GATEWAY, e.to_string());
        }
    };

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }
    let body = match upstream.bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => return error_body(StatusCode::BAD_GATEWAY, e.to_string()),
    };

    let mut response = Body::from(body).into_response();
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty())
}

async fn save_history(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(input): Json<SaveHistory>,
) -> Response {
    if !has_bearer(&headers) {
        return error_body(StatusCode::UNAUTHORIZED, "missing bearer token");
    }
    let entry = StoredEntry {
        id: Uuid::new_v4(),
        url: input.url,
        method: input.method,
        headers: input.headers,
        body: input.body,
        time: input.time,
        user_id: input.user_id,
    };
    tracing::info!(user_id = %entry.user_id, url = %entry.url, "history saved");
    state
        .history
        .write()
        .await
        .entry(entry.user_id.clone())
        .or_default()
        .insert(0, entry.clone());
    (StatusCode::CREATED, Json(entry)).into_response()
}

async fn get_history(State(state): State<Shared>, Query(query): Query<HistoryQuery>) -> Response {
    let Some(user_id) = query.user_id.filter(|u| !u.is_empty()) else {
        return error_body(StatusCode::BAD_REQUEST, "user_id is required");
    };
    let history = state.history_for(&user_id).await;
    Json(json!({ "history": history })).into_response()
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = serde_json::from_str(&body).unwrap_or(Value::String(body));
    Json(json!({ "method": method.as_str(), "headers": headers, "body": body }))
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, Json(json!({ "status": code }))).into_response(),
        Err(_) => error_body(StatusCode::BAD_REQUEST, "invalid status code"),
    }
}

async fn delay(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "delayed_ms": ms }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_history_requires_user_id() {
        let result: Result<SaveHistory, _> =
            serde_json::from_str(r#"{"url":"https://a.test","method":"GET"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn save_history_defaults_optional_fields() {
        let input: SaveHistory =
            serde_json::from_str(r#"{"url":"https://a.test","method":"GET","user_id":"u1"}"#).unwrap();
        assert_eq!(input.time, "");
        assert!(input.headers.is_null());
    }

    #[test]
    fn forward_request_defaults_to_get() {
        let input: ForwardRequest = serde_json::from_str(r#"{"url":"https://a.test"}"#).unwrap();
        assert_eq!(input.method, "GET");
        assert!(input.headers.is_empty());
        assert!(input.body.is_null());
    }

    #[test]
    fn bearer_detection() {
        let mut headers = HeaderMap::new();
        assert!(!has_bearer(&headers));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(!has_bearer(&headers));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(!has_bearer(&headers));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(has_bearer(&headers));
    }

    #[test]
    fn stored_entry_serializes_wire_names() {
        let entry = StoredEntry {
            id: Uuid::nil(),
            url: "https://a.test".to_string(),
            method: "POST".to_string(),
            headers: json!([]),
            body: json!("{}"),
            time: "t".to_string(),
            user_id: "u1".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["time"], "t");
    }
}
