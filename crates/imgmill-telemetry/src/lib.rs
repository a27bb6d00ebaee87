//! Telemetry primitives shared across the imgmill workspace.
//!
//! This crate centralises logging, metrics, and request-id helpers so the
//! pipeline and delivery surfaces can adopt a consistent observability story.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Default logging target when `RUST_LOG` is not provided.
const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber cannot be installed (for example,
/// because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    BUILD_SHA
        .set(config.build_sha.to_string())
        .ok()
        .or(Some(()));

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.level));

    let install = |format: LogFormat| {
        let builder = tracing_subscriber::fmt::fmt()
            .with_env_filter(env_filter.clone())
            .with_target(false)
            .with_thread_ids(false);

        match format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        }
    };

    install(config.format).map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    Ok(())
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    pub level: &'a str,
    pub format: LogFormat,
    pub build_sha: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Access the build SHA recorded during logging initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Factory for the `x-request-id` generator layer.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that propagates an incoming `x-request-id` header.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    pipeline_stages_total: IntCounterVec,
    requests_in_flight: IntGauge,
    variants_generated_total: IntCounter,
    variant_failures_total: IntCounter,
    last_archive_bytes: IntGauge,
    request_latency_ms: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_in_flight: i64,
    pub variants_generated_total: u64,
    pub variant_failures_total: u64,
    pub last_archive_bytes: i64,
    pub request_latency_ms: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Domain events emitted by type"),
            &["type"],
        )?;
        let pipeline_stages_total = IntCounterVec::new(
            Opts::new(
                "pipeline_stages_total",
                "Variant pipeline stages executed by status",
            ),
            &["stage", "status"],
        )?;
        let requests_in_flight = IntGauge::with_opts(Opts::new(
            "requests_in_flight",
            "Variant requests currently being processed",
        ))?;
        let variants_generated_total = IntCounter::with_opts(Opts::new(
            "variants_generated_total",
            "Variant files written across all requests",
        ))?;
        let variant_failures_total = IntCounter::with_opts(Opts::new(
            "variant_failures_total",
            "Variants that failed to render and were skipped",
        ))?;
        let last_archive_bytes = IntGauge::with_opts(Opts::new(
            "last_archive_bytes",
            "Size of the most recently packed archive (bytes)",
        ))?;
        let request_latency_ms = IntGauge::with_opts(Opts::new(
            "request_latency_ms",
            "Wall-clock time of the most recent pipeline run (ms)",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(events_emitted_total.clone()))?;
        registry.register(Box::new(pipeline_stages_total.clone()))?;
        registry.register(Box::new(requests_in_flight.clone()))?;
        registry.register(Box::new(variants_generated_total.clone()))?;
        registry.register(Box::new(variant_failures_total.clone()))?;
        registry.register(Box::new(last_archive_bytes.clone()))?;
        registry.register(Box::new(request_latency_ms.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                events_emitted_total,
                pipeline_stages_total,
                requests_in_flight,
                variants_generated_total,
                variant_failures_total,
                last_archive_bytes,
                request_latency_ms,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Increment the pipeline stage counter.
    pub fn inc_pipeline_stage(&self, stage: &str, status: &str) {
        self.inner
            .pipeline_stages_total
            .with_label_values(&[stage, status])
            .inc();
    }

    /// Increment the in-flight request gauge.
    pub fn inc_requests_in_flight(&self) {
        self.inner.requests_in_flight.inc();
    }

    /// Decrement the in-flight request gauge.
    pub fn dec_requests_in_flight(&self) {
        self.inner.requests_in_flight.dec();
    }

    /// Add to the generated variant counter.
    pub fn add_variants_generated(&self, count: u64) {
        self.inner.variants_generated_total.inc_by(count);
    }

    /// Increment the variant failure counter.
    pub fn inc_variant_failure(&self) {
        self.inner.variant_failures_total.inc();
    }

    /// Record the size of the most recently packed archive.
    pub fn set_last_archive_bytes(&self, value: i64) {
        self.inner.last_archive_bytes.set(value);
    }

    /// Record the wall-clock latency of the most recent pipeline run.
    pub fn observe_request_latency(&self, duration: Duration) {
        self.inner
            .request_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_in_flight: self.inner.requests_in_flight.get(),
            variants_generated_total: self.inner.variants_generated_total.get(),
            variant_failures_total: self.inner.variant_failures_total.get(),
            last_archive_bytes: self.inner.last_archive_bytes.get(),
            request_latency_ms: self.inner.request_latency_ms.get(),
        }
    }

    fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/v1/variants", 200);
        metrics.inc_event("archive_packed");
        metrics.inc_pipeline_stage("materialize", "completed");
        metrics.inc_requests_in_flight();
        metrics.add_variants_generated(8);
        metrics.inc_variant_failure();
        metrics.set_last_archive_bytes(4_096);
        metrics.observe_request_latency(Duration::from_millis(120));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_in_flight, 1);
        assert_eq!(snapshot.variants_generated_total, 8);
        assert_eq!(snapshot.variant_failures_total, 1);
        assert_eq!(snapshot.last_archive_bytes, 4_096);
        assert_eq!(snapshot.request_latency_ms, 120);

        metrics.dec_requests_in_flight();
        assert_eq!(metrics.snapshot().requests_in_flight, 0);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("pipeline_stages_total"));
        assert!(rendered.contains("variant_failures_total"));
        Ok(())
    }

    #[test]
    fn request_id_layers_can_be_constructed() {
        let _set_layer = set_request_id_layer();
        let _prop_layer = propagate_request_id_layer();
    }
}
