//! Boundary contract between the delivery surface and the orchestrator.
//!
//! The orchestrator is transport-agnostic: it consumes a [`RawRequest`] with
//! lowercased header names and a base64 body, and produces a
//! [`BoundaryResponse`] ready to be adapted back onto whatever HTTP surface
//! invoked it.

use std::collections::HashMap;

/// Immutable view of an incoming request.
#[derive(Debug, Clone)]
pub struct RawRequest {
    /// HTTP method of the request.
    pub method: String,
    /// Header map with lowercased names.
    pub headers: HashMap<String, String>,
    /// Request body, base64 encoded.
    pub body: String,
}

impl RawRequest {
    /// Build a request, lowercasing header names on the way in.
    pub fn new<I, K, V>(method: &str, headers: I, body: String) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
            .collect();
        Self {
            method: method.to_string(),
            headers,
            body,
        }
    }

    /// Look up a header by its lowercase name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Transport-level response produced by the orchestrator.
#[derive(Debug, Clone)]
pub struct BoundaryResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers in emission order.
    pub headers: Vec<(String, String)>,
    /// Response body; base64 encoded when `is_base64_encoded` is set.
    pub body: String,
    /// Whether `body` must be base64-decoded before transmission as bytes.
    pub is_base64_encoded: bool,
}

/// Extract the `boundary` parameter from a `content-type` header value.
///
/// Returns `None` when the parameter is absent or empty. Surrounding quotes
/// and trailing parameters are stripped.
#[must_use]
pub fn extract_boundary(content_type: &str) -> Option<String> {
    let (_, rest) = content_type.split_once("boundary=")?;
    let token = rest.split(';').next().unwrap_or(rest);
    let token = token.trim().trim_matches('"');
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
