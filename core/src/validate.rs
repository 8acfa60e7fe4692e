//! Pure helpers that gate and shape a request before dispatch.
//!
//! `beautify` and `minify` are editor conveniences and never fail: invalid
//! input comes back untouched. `parse_body_or_fail` is the dispatch gate and
//! does fail, so a malformed body never reaches the network.

use serde_json::{Map, Value};

use crate::error::DispatchError;
use crate::http::HttpMethod;
use crate::types::{HeaderMap, HeaderPair};

/// True iff `s` parses as an absolute URL with a scheme and an authority.
pub fn is_valid_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(parsed) => parsed.has_host(),
        Err(_) => false,
    }
}

/// Fold header rows into a map, skipping blank keys. Later duplicates win.
pub fn to_header_map(pairs: &[HeaderPair]) -> HeaderMap {
    pairs
        .iter()
        .filter(|p| !p.key.trim().is_empty())
        .fold(HeaderMap::new(), |mut map, p| {
            map.insert(p.key.clone(), p.value.clone());
            map
        })
}

/// Pretty-print JSON with 2-space indentation, or return `text` unchanged.
pub fn beautify(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| text.to_string())
}

/// Compact JSON onto a single line, or return `text` unchanged.
pub fn minify(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| text.to_string())
}

/// Parse the request body for dispatch.
///
/// GET bodies are never looked at and blank bodies become `{}`. Anything else
/// must be strict JSON.
pub fn parse_body_or_fail(text: &str, method: HttpMethod) -> Result<Value, DispatchError> {
    if !method.allows_body() || text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(text).map_err(|_| DispatchError::InvalidBody)
}
