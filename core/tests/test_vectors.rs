//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Forwarding vectors pair user inputs with the request sent to the backend,
//! and simulated backend outcomes with the record shown to the user. History
//! vectors cover every payload shape the listing endpoint may answer with.
//! Comparisons are made on parsed JSON, so key order never matters.

use serde_json::Value;
use workbench_core::{
    BackendClient, HeaderMap, HttpMethod, HttpResponse, ResponseRecord, TransportError,
};

const BASE_URL: &str = "http://localhost:5000";

fn client() -> BackendClient {
    BackendClient::new(BASE_URL)
}

fn header_pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let pair = pair.as_array().unwrap();
            (
                pair[0].as_str().unwrap().to_string(),
                pair[1].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn outcome(value: &Value) -> Result<HttpResponse, TransportError> {
    match value.as_str() {
        Some("timeout") => Err(TransportError::Timeout),
        Some("unreachable") => Err(TransportError::Unreachable("connection refused".to_string())),
        Some(other) => panic!("unknown outcome: {other}"),
        None => Ok(HttpResponse {
            status: value["status"].as_u64().unwrap() as u16,
            status_text: value["status_text"].as_str().unwrap().to_string(),
            headers: header_pairs(&value["headers"]),
            body: value["body"].as_str().unwrap().to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Forward
// ---------------------------------------------------------------------------

#[test]
fn forward_build_vectors() {
    let raw = include_str!("../../test-vectors/forward.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["build"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let method: HttpMethod = input["method"].as_str().unwrap().parse().unwrap();
        let headers: HeaderMap = serde_json::from_value(input["headers"].clone()).unwrap();
        let expected = &case["expected_request"];

        let req = c.build_forward(
            input["url"].as_str().unwrap(),
            method,
            &headers,
            &input["body"],
            case["token"].as_str(),
        );

        assert_eq!(req.method.as_str(), expected["method"].as_str().unwrap(), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");
        assert_eq!(req.headers, header_pairs(&expected["headers"]), "{name}: headers");

        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

#[test]
fn forward_parse_vectors() {
    let raw = include_str!("../../test-vectors/forward.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["parse"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let elapsed = case["elapsed_ms"].as_f64().unwrap();

        let record = c.parse_forward(outcome(&case["outcome"]), elapsed);
        let expected = &case["expected"];

        assert_eq!(record.is_error(), expected["error"] == true, "{name}: is_error");
        assert_eq!(serde_json::to_value(&record).unwrap(), *expected, "{name}: record");
        if let ResponseRecord::Success(data) = &record {
            assert_eq!(data.elapsed_ms, elapsed, "{name}: elapsed kept unrounded");
        }
    }
}

// ---------------------------------------------------------------------------
// History listing
// ---------------------------------------------------------------------------

#[test]
fn history_listing_vectors() {
    let raw = include_str!("../../test-vectors/history.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: case["payload"].to_string(),
        };

        let result = c.parse_fetch_history(response);
        if case["expected_error"] == true {
            assert!(result.is_err(), "{name}: expected an error, got {result:?}");
            continue;
        }

        let urls: Vec<String> = result
            .unwrap_or_else(|e| panic!("{name}: {e}"))
            .into_iter()
            .map(|entry| entry.url)
            .collect();
        let expected: Vec<String> = serde_json::from_value(case["expected_urls"].clone()).unwrap();
        assert_eq!(urls, expected, "{name}: urls");
    }
}
