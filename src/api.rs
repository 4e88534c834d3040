//! Admin dashboard API client.
//!
//! Thin wrapper over `reqwest` used by the list controllers (paginated GETs)
//! and the catalog mutations (multipart/JSON POSTs, DELETEs). All failures
//! are mapped into [`AdminError`] with user-facing messages.

use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::AdminConfig;
use crate::error::AdminError;

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the admin API origin:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_admin_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    // "/api/" leaves a slash behind
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn friendly_error(url: &str, err: &reqwest::Error) -> AdminError {
    let message = if err.is_connect() {
        format!("Cannot reach admin dashboard at {url}")
    } else if err.is_timeout() {
        format!("Connection to {url} timed out")
    } else if err.is_body() || err.is_decode() {
        format!("Connection to {url} dropped while reading the response")
    } else if err.is_builder() {
        format!("Invalid admin dashboard URL: {url}")
    } else {
        format!("Network error communicating with {url}: {err}")
    };
    AdminError::Transport(message)
}

fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Admin session is invalid or expired".to_string(),
        403 => "Not authorized for this admin action".to_string(),
        404 => "Admin dashboard endpoint not found".to_string(),
        422 => "Validation failed".to_string(),
        s if s >= 500 => format!("Admin dashboard server error (HTTP {s})"),
        s => format!("Unexpected response from admin dashboard (HTTP {s})"),
    }
}

/// Flatten a Laravel-style `errors` object (`field -> [messages]` or
/// `field -> message`) into a sorted map.
pub(crate) fn collect_field_errors(errors: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    let Some(Value::Object(map)) = errors else {
        return out;
    };
    for (field, value) in map {
        let messages: Vec<String> = match value {
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Value::String(s) => vec![s.clone()],
            Value::Null => Vec::new(),
            other => vec![other.to_string()],
        };
        if !messages.is_empty() {
            out.insert(field.clone(), messages);
        }
    }
    out
}

/// Build the error for a non-2xx response, preserving the server's message
/// and validation details when the body is JSON.
pub fn http_failure(status: StatusCode, body_text: &str) -> AdminError {
    let trimmed = body_text.trim();
    let message = match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => {
            let mut message = json
                .get("message")
                .or_else(|| json.get("error"))
                .and_then(Value::as_str)
                .map(|s| s.to_string())
                .unwrap_or_else(|| status_error(status));
            let details: Vec<String> = collect_field_errors(json.get("errors"))
                .into_values()
                .flatten()
                .collect();
            if !details.is_empty() {
                message = format!("{message}: {}", details.join(", "));
            }
            message
        }
        Err(_) if !trimmed.is_empty() => trimmed.to_string(),
        Err(_) => status_error(status),
    };
    AdminError::Http {
        status: status.as_u16(),
        message,
    }
}

/// Interpret a 2xx mutation response. `status: true` yields the `data`
/// payload (or `null`); anything else is a rejection.
pub fn parse_action_response(body_text: &str) -> Result<Value, AdminError> {
    let json: Value = serde_json::from_str(body_text.trim())
        .map_err(|e| AdminError::Format(format!("invalid JSON from admin dashboard: {e}")))?;

    if json.get("status").and_then(Value::as_bool) == Some(true) {
        return Ok(json.get("data").cloned().unwrap_or(Value::Null));
    }

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Operation failed".to_string());
    Err(AdminError::Rejected {
        message,
        errors: collect_field_errors(json.get("errors")),
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client bound to one admin API origin.
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: Client,
    base: String,
}

impl AdminClient {
    pub fn new(config: &AdminConfig) -> Result<Self, AdminError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AdminError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base: normalize_admin_url(&config.api_origin),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `path` should include the leading slash, e.g. `/api/home-filters`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// GET a JSON document. Empty bodies come back as `Value::Null`.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, AdminError> {
        let req = self
            .client
            .get(self.url(path))
            .query(query)
            .header("Accept", "application/json");
        let (status, body_text) = self.send(req).await?;
        if !status.is_success() {
            return Err(http_failure(status, &body_text));
        }
        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text)
            .map_err(|e| AdminError::Format(format!("invalid JSON from admin dashboard: {e}")))
    }

    /// POST a JSON body to a mutation endpoint.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, AdminError> {
        let req = self
            .client
            .post(self.url(path))
            .header("Accept", "application/json")
            .json(body);
        self.send_action(req).await
    }

    /// POST a multipart form to a mutation endpoint. The boundary header is
    /// set by reqwest.
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Value, AdminError> {
        let req = self
            .client
            .post(self.url(path))
            .header("Accept", "application/json")
            .multipart(form);
        self.send_action(req).await
    }

    /// DELETE a resource. Success is the HTTP status alone; the body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), AdminError> {
        let req = self.client.delete(self.url(path));
        let (status, body_text) = self.send(req).await?;
        if !status.is_success() {
            return Err(http_failure(status, &body_text));
        }
        Ok(())
    }

    async fn send_action(&self, req: RequestBuilder) -> Result<Value, AdminError> {
        let (status, body_text) = self.send(req).await?;
        if !status.is_success() {
            return Err(http_failure(status, &body_text));
        }
        parse_action_response(&body_text)
    }

    async fn send(&self, req: RequestBuilder) -> Result<(StatusCode, String), AdminError> {
        let start = Instant::now();
        let resp = req.send().await.map_err(|e| {
            let err = friendly_error(&self.base, &e);
            warn!(error = %err, "admin request failed");
            err
        })?;
        let status = resp.status();
        let url = resp.url().path().to_string();
        let body_text = resp.text().await.map_err(|e| {
            let err = friendly_error(&self.base, &e);
            warn!(path = %url, error = %err, "admin response body unreadable");
            err
        })?;
        debug!(
            path = %url,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "admin response"
        );
        Ok((status, body_text))
    }
}
