//! Domain types shared by the builder, the dispatch engine and history.
//!
//! # Design
//! `RequestDescriptor` is the form as the user typed it, header rows and raw
//! body text included. `HeaderMap` is derived from it only at dispatch time.
//! `HistoryEntry` mirrors the wire shape of the history service (`time`,
//! `user_id`) and tolerates partial payloads on the way in, since remote
//! entries are not guaranteed to be complete.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::DispatchError;
use crate::http::HttpMethod;

/// Normalized header mapping sent to the forwarding endpoint.
pub type HeaderMap = BTreeMap<String, String>;

/// One header row of the builder. Keys need not be unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPair {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl HeaderPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A user-composed request, exactly as entered in the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<HeaderPair>,
    /// Raw body text. Ignored when `method` is GET.
    pub body: String,
}

impl Default for RequestDescriptor {
    /// An empty GET form with a single blank header row.
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::Get,
            headers: vec![HeaderPair::default()],
            body: String::new(),
        }
    }
}

impl From<&HistoryEntry> for RequestDescriptor {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            url: entry.url.clone(),
            method: entry.method,
            headers: entry.headers.clone(),
            body: entry.body.clone(),
        }
    }
}

/// Identity supplied by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Immutable record of one dispatch attempt's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, deserialize_with = "header_rows")]
    pub headers: Vec<HeaderPair>,
    #[serde(default)]
    pub body: String,
    /// Locale-formatted creation time.
    #[serde(rename = "time", alias = "savedAt", default)]
    pub saved_at: String,
    #[serde(
        rename = "user_id",
        alias = "userId",
        default,
        deserialize_with = "optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
}

impl HistoryEntry {
    /// Snapshot `descriptor` now, tagged with `user_id` when a session exists.
    pub fn capture(descriptor: &RequestDescriptor, user_id: Option<String>) -> Self {
        Self {
            url: descriptor.url.clone(),
            method: descriptor.method,
            headers: descriptor.headers.clone(),
            body: descriptor.body.clone(),
            saved_at: locale_timestamp(chrono::Local::now()),
            user_id,
        }
    }
}

/// Format a timestamp the way an en-US `toLocaleString` does,
/// e.g. `3/7/2025, 4:05:09 PM`.
pub fn locale_timestamp<Tz>(at: chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Accept header rows as `[{key, value}]` or as a `{name: value}` object.
fn header_rows<'de, D>(deserializer: D) -> Result<Vec<HeaderPair>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Rows {
        List(Vec<HeaderPair>),
        Map(BTreeMap<String, String>),
        Missing(Option<()>),
    }

    Ok(match Rows::deserialize(deserializer)? {
        Rows::List(rows) => rows,
        Rows::Map(map) => map.into_iter().map(|(k, v)| HeaderPair::new(k, v)).collect(),
        Rows::Missing(_) => Vec::new(),
    })
}

/// User ids arrive as strings or numbers depending on the backend.
fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Colour bucket used by the response viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirect,
    Failure,
}

/// Successful dispatch outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseData {
    pub status: u16,
    pub headers: HeaderMap,
    pub data: Value,
    /// Wall-clock latency in milliseconds, rounded to 2 decimals.
    #[serde(rename = "time", serialize_with = "two_decimals")]
    pub elapsed_ms: f64,
}

fn two_decimals<S: Serializer>(ms: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{ms:.2}"))
}

/// What the response area shows after a dispatch attempt: exactly one of a
/// response or a classified error.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseRecord {
    Success(ResponseData),
    Failure(DispatchError),
}

impl ResponseRecord {
    pub fn is_error(&self) -> bool {
        matches!(self, ResponseRecord::Failure(_))
    }

    pub fn message(&self) -> Option<String> {
        match self {
            ResponseRecord::Failure(err) => Some(err.to_string()),
            ResponseRecord::Success(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ResponseRecord::Success(data) => Some(data.status),
            ResponseRecord::Failure(_) => None,
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self.status() {
            Some(s) if (200..300).contains(&s) => StatusClass::Success,
            Some(s) if (300..400).contains(&s) => StatusClass::Redirect,
            _ => StatusClass::Failure,
        }
    }

    /// Response body pretty-printed with 2-space indentation.
    pub fn pretty_data(&self) -> Option<String> {
        match self {
            ResponseRecord::Success(data) => serde_json::to_string_pretty(&data.data).ok(),
            ResponseRecord::Failure(_) => None,
        }
    }
}

impl Serialize for ResponseRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct ErrorBody {
            error: bool,
            message: String,
        }

        match self {
            ResponseRecord::Success(data) => data.serialize(serializer),
            ResponseRecord::Failure(err) => ErrorBody {
                error: true,
                message: err.to_string(),
            }
            .serialize(serializer),
        }
    }
}
