//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use imgmill_telemetry::build_sha;
use serde::Serialize;
use tracing::error;

use crate::http::errors::ApiError;
use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) build: String,
    pub(crate) degraded: Vec<String>,
    pub(crate) last_event_id: Option<u64>,
    pub(crate) metrics: HealthMetricsResponse,
}

#[derive(Serialize)]
pub(crate) struct HealthMetricsResponse {
    pub(crate) requests_in_flight: i64,
    pub(crate) variants_generated_total: u64,
    pub(crate) variant_failures_total: u64,
    pub(crate) last_archive_bytes: i64,
    pub(crate) request_latency_ms: i64,
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let snapshot = state.telemetry.snapshot();
    let degraded = state.current_health_degraded();
    let status = if degraded.is_empty() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status,
        build: build_sha().to_string(),
        degraded,
        last_event_id: state.events.last_event_id(),
        metrics: HealthMetricsResponse {
            requests_in_flight: snapshot.requests_in_flight,
            variants_generated_total: snapshot.variants_generated_total,
            variant_failures_total: snapshot.variant_failures_total,
            last_archive_bytes: snapshot.last_archive_bytes,
            request_latency_ms: snapshot.request_latency_ms,
        },
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
