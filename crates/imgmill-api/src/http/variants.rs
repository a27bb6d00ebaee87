//! Variant processing endpoint.
//!
//! Adapts the incoming axum request to the pipeline's boundary contract
//! (lowercased header map, base64 body), runs the orchestrator on the
//! blocking pool, and adapts the boundary response back into an HTTP
//! response.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use imgmill_pipeline::{BoundaryResponse, RawRequest};
use tracing::error;

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn process_variants(
    State(state): State<Arc<ApiState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let raw = adapt_request(&method, &headers, &body);
    let orchestrator = state.orchestrator.clone();
    let boundary = tokio::task::spawn_blocking(move || orchestrator.handle(&raw))
        .await
        .map_err(|err| {
            error!(error = %err, "variant pipeline task panicked");
            state.add_degraded_component("pipeline");
            ApiError::internal("variant pipeline task failed")
        })?;
    adapt_response(boundary)
}

fn adapt_request(method: &Method, headers: &HeaderMap, body: &[u8]) -> RawRequest {
    let headers = headers.iter().filter_map(|(name, value)| {
        value
            .to_str()
            .ok()
            .map(|value| (name.as_str(), value.to_string()))
    });
    RawRequest::new(method.as_str(), headers, BASE64.encode(body))
}

fn adapt_response(boundary: BoundaryResponse) -> Result<Response, ApiError> {
    let status = StatusCode::from_u16(boundary.status_code)
        .map_err(|_| ApiError::internal("invalid status code from pipeline"))?;
    let payload = if boundary.is_base64_encoded {
        BASE64
            .decode(boundary.body.as_bytes())
            .map_err(|_| ApiError::internal("invalid base64 payload from pipeline"))?
    } else {
        boundary.body.into_bytes()
    };

    let mut builder = Response::builder().status(status);
    for (name, value) in &boundary.headers {
        let Ok(name) = name.parse::<HeaderName>() else {
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            continue;
        };
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(payload))
        .map_err(|_| ApiError::internal("failed to build pipeline response"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_adaptation_lowercases_headers_and_encodes_the_body() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Content-Type",
            HeaderValue::from_static("multipart/form-data; boundary=abc"),
        );
        let raw = adapt_request(&Method::POST, &headers, b"payload");
        assert_eq!(raw.method, "POST");
        assert_eq!(
            raw.header("content-type"),
            Some("multipart/form-data; boundary=abc")
        );
        assert_eq!(raw.body, BASE64.encode(b"payload"));
    }

    #[test]
    fn base64_responses_are_decoded_to_bytes() {
        let boundary = BoundaryResponse {
            status_code: 200,
            headers: vec![("Content-Type".to_string(), "application/zip".to_string())],
            body: BASE64.encode(b"PK\x03\x04"),
            is_base64_encoded: true,
        };
        let response = adapt_response(boundary).expect("adaptable response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|value| value.to_str().ok()),
            Some("application/zip")
        );
    }
}
