//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    http::{Method, Request, header::CONTENT_TYPE},
    routing::{any, get},
};
use imgmill_config::ImgmillConfig;
use imgmill_events::EventBus;
use imgmill_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::http::variants::process_variants;
use crate::state::ApiState;

const HEADER_REQUEST_ID: &str = "x-request-id";

/// Axum router wrapper that hosts the imgmill API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a new API server with shared dependencies wired through
    /// application state.
    #[must_use]
    pub fn new(config: &ImgmillConfig, events: EventBus, telemetry: Metrics) -> Self {
        let state = Arc::new(ApiState::new(config, events, telemetry.clone()));

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path();
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    let status = response.status().as_u16();
                    span.record("status_code", status);
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(imgmill_telemetry::propagate_request_id_layer())
            .layer(imgmill_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        // The processing route accepts any method so the orchestrator's own
        // method guard answers non-POST traffic.
        let router = Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/v1/variants", any(process_variants))
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    /// Serve the API using the configured router on the supplied address.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server
    /// terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        tracing::info!("Starting API on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service()).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use imgmill_test_support::images::tiny_png;
    use imgmill_test_support::multipart::{PartSpec, build_body, content_type_header};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "----imgmill-router";

    fn server(work_root: &TempDir) -> Result<ApiServer> {
        let mut config = ImgmillConfig::default();
        config.pipeline.work_root = work_root.path().to_path_buf();
        Ok(ApiServer::new(
            &config,
            EventBus::with_capacity(64),
            Metrics::new()?,
        ))
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() -> Result<()> {
        let root = TempDir::new()?;
        let server = server(&root)?;
        let response = server
            .router()
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["status"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_prometheus_text() -> Result<()> {
        let root = TempDir::new()?;
        let server = server(&root)?;
        let response = server
            .router()
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8(body.to_vec())?;
        assert!(text.contains("requests_in_flight"));
        Ok(())
    }

    #[tokio::test]
    async fn variant_upload_returns_a_zip_attachment() -> Result<()> {
        let root = TempDir::new()?;
        let server = server(&root)?;
        let body = build_body(
            BOUNDARY,
            &[PartSpec::new("photo.png", "image/png", tiny_png()?)],
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/variants")
            .header(CONTENT_TYPE, content_type_header(BOUNDARY))
            .body(Body::from(body))?;

        let response = server.router().clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("application/zip")
        );
        let payload = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&payload[..2], b"PK");
        Ok(())
    }

    #[tokio::test]
    async fn non_post_traffic_is_rejected_with_405() -> Result<()> {
        let root = TempDir::new()?;
        let server = server(&root)?;
        let response = server
            .router()
            .clone()
            .oneshot(Request::builder().uri("/v1/variants").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["error"], "method not allowed");
        Ok(())
    }
}
