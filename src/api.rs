//! Storefront backend API client.
//!
//! Provides HTTP communication with the CaffeRine backend, used for the
//! product catalog, hero slides, order submission, and receipt delivery.

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Message surfaced when the backend answers with an unexpected envelope.
pub const INVALID_FORMAT: &str = "Invalid data format received";

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment (paths passed to this client include it)
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_backend_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    // Strip trailing slashes again (in case "/api/" was present)
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure modes of a backend call.
///
/// Order submission treats these differently: transport failures may be
/// tolerated in demo mode, while an HTTP rejection (e.g. out of stock) always
/// blocks the sale, so the two must stay distinguishable after the call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("{0}")]
    Network(String),
    /// The backend answered with a non-success status. `message` carries the
    /// backend's own `message` body field when present, verbatim.
    #[error("{message}")]
    Status { code: u16, message: String },
    /// The response arrived but its body was not the expected shape.
    #[error("{0}")]
    Shape(String),
}

impl ApiError {
    /// True for transport-level failures (connect, timeout, DNS).
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> ApiError {
    if err.is_connect() {
        return ApiError::Network(format!("Cannot reach backend at {url}"));
    }
    if err.is_timeout() {
        return ApiError::Network(format!("Connection to {url} timed out"));
    }
    if err.is_builder() {
        return ApiError::Network(format!("Invalid backend URL: {url}"));
    }
    ApiError::Network(format!("Network error communicating with {url}: {err}"))
}

/// Convert an HTTP status code into a user-friendly fallback message, used
/// when the error body carries no `message` of its own.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        404 => "Backend endpoint not found".to_string(),
        s if s >= 500 => format!("Backend server error (HTTP {s})"),
        s => format!("Unexpected response from backend (HTTP {s})"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Perform a request against the backend.
///
/// `path` should include the leading slash, e.g. `/api/products`.
async fn request(
    backend_url: &str,
    path: &str,
    method: Method,
    body: Option<Value>,
) -> Result<Value, ApiError> {
    let base = normalize_backend_url(backend_url);
    let full_url = format!("{base}{path}");

    let client = Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {e}")))?;

    let mut req = client
        .request(method, &full_url)
        .header("Accept", "application/json");

    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = req.send().await.map_err(|e| friendly_error(&base, &e))?;
    let status = resp.status();

    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        // The backend reports failures as JSON with a `message` field
        // ("out of stock" and friends). Surface that text unchanged so the
        // cashier sees what the server said, not a paraphrase.
        let message = serde_json::from_str::<Value>(&body_text)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .or_else(|| json.get("error"))
                    .and_then(Value::as_str)
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| status_error(status));
        warn!(
            status = status.as_u16(),
            path = %path,
            message = %message,
            "backend request rejected"
        );
        return Err(ApiError::Status {
            code: status.as_u16(),
            message,
        });
    }

    // Return the JSON body, or null for empty 204 responses.
    let body_text = resp.text().await.unwrap_or_default();
    if body_text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body_text)
        .map_err(|e| ApiError::Shape(format!("Invalid JSON from backend: {e}")))
}

/// GET a JSON document from the backend.
pub async fn get_json(backend_url: &str, path: &str) -> Result<Value, ApiError> {
    request(backend_url, path, Method::GET, None).await
}

/// POST a JSON document to the backend and return the parsed response body.
pub async fn post_json(
    backend_url: &str,
    path: &str,
    body: Option<Value>,
) -> Result<Value, ApiError> {
    request(backend_url, path, Method::POST, body).await
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Unwrap the backend's `{ "status": "success", "data": ... }` envelope,
/// returning the inner `data` document.
pub fn unwrap_envelope(value: Value) -> Result<Value, ApiError> {
    let ok = value
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s == "success")
        .unwrap_or(false);
    if !ok {
        return Err(ApiError::Shape(INVALID_FORMAT.to_string()));
    }
    match value.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Err(ApiError::Shape(INVALID_FORMAT.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_adds_https_scheme_for_remote_hosts() {
        assert_eq!(
            normalize_backend_url("api.cafferine.app"),
            "https://api.cafferine.app"
        );
    }

    #[test]
    fn normalize_adds_http_scheme_for_localhost() {
        assert_eq!(
            normalize_backend_url("localhost:8000"),
            "http://localhost:8000"
        );
        assert_eq!(
            normalize_backend_url("127.0.0.1:8000"),
            "http://127.0.0.1:8000"
        );
    }

    #[test]
    fn normalize_strips_trailing_slashes_and_api_segment() {
        assert_eq!(
            normalize_backend_url("http://localhost:8000/"),
            "http://localhost:8000"
        );
        assert_eq!(
            normalize_backend_url("https://api.cafferine.app/api/"),
            "https://api.cafferine.app"
        );
        assert_eq!(
            normalize_backend_url("https://api.cafferine.app/api"),
            "https://api.cafferine.app"
        );
    }

    #[test]
    fn normalize_keeps_existing_scheme() {
        assert_eq!(
            normalize_backend_url("  http://10.0.0.5:8000  "),
            "http://10.0.0.5:8000"
        );
    }

    #[test]
    fn unwrap_envelope_returns_inner_data() {
        let data = unwrap_envelope(json!({
            "status": "success",
            "data": [{"pro_id": 1}]
        }))
        .expect("envelope should unwrap");
        assert_eq!(data, json!([{"pro_id": 1}]));
    }

    #[test]
    fn unwrap_envelope_rejects_non_success_status() {
        let err = unwrap_envelope(json!({ "status": "error", "data": [] }))
            .expect_err("non-success status should fail");
        assert_eq!(err.to_string(), INVALID_FORMAT);
    }

    #[test]
    fn unwrap_envelope_rejects_missing_or_null_data() {
        let missing =
            unwrap_envelope(json!({ "status": "success" })).expect_err("missing data should fail");
        assert_eq!(missing.to_string(), INVALID_FORMAT);

        let null = unwrap_envelope(json!({ "status": "success", "data": null }))
            .expect_err("null data should fail");
        assert_eq!(null.to_string(), INVALID_FORMAT);
    }

    #[test]
    fn status_error_display_is_the_backend_message_verbatim() {
        let err = ApiError::Status {
            code: 400,
            message: "out of stock".to_string(),
        };
        assert_eq!(err.to_string(), "out of stock");
        assert!(!err.is_network());
    }

    #[test]
    fn network_error_is_distinguishable() {
        let err = ApiError::Network("Cannot reach backend at http://localhost:8000".to_string());
        assert!(err.is_network());
        assert_eq!(
            err.to_string(),
            "Cannot reach backend at http://localhost:8000"
        );
    }
}
