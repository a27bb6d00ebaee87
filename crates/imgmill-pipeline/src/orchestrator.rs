//! Request orchestrator.
//!
//! Drives one upload through the pipeline: guard validation, multipart
//! decode, materialization, variant generation, and packaging. The working
//! area is created only after the decode guard passes, and both of its
//! directories are removed on every exit path, success or failure, before
//! the response is produced.

use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use imgmill_config::PipelineConfig;
use imgmill_events::{Event, EventBus};
use imgmill_telemetry::Metrics;
use uuid::Uuid;

use crate::boundary::{BoundaryResponse, RawRequest, extract_boundary};
use crate::codec::WebpEncoder;
use crate::error::{PipelineError, PipelineResult};
use crate::materialize::materialize;
use crate::multipart::{FilePart, decode};
use crate::pack::pack;
use crate::variants::generate;
use crate::workarea::WorkArea;

const ARCHIVE_FILENAME: &str = "imgmill-variants.zip";

/// Service that executes the variant pipeline for one request at a time.
#[derive(Clone)]
pub struct Orchestrator {
    events: EventBus,
    metrics: Metrics,
    config: PipelineConfig,
}

impl Orchestrator {
    /// Construct an orchestrator backed by the shared event bus and metrics.
    #[must_use]
    pub const fn new(events: EventBus, metrics: Metrics, config: PipelineConfig) -> Self {
        Self {
            events,
            metrics,
            config,
        }
    }

    /// Run the pipeline for one request and produce the boundary response.
    ///
    /// Never returns an error: every failure is mapped to an error response
    /// with the status code dictated by the error taxonomy.
    #[must_use]
    pub fn handle(&self, request: &RawRequest) -> BoundaryResponse {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        self.metrics.inc_requests_in_flight();
        self.emit(Event::RequestReceived { request_id });

        let result = self.execute(request_id, request);

        self.metrics.dec_requests_in_flight();
        self.metrics.observe_request_latency(started.elapsed());

        match result {
            Ok(archive) => {
                self.emit(Event::RequestCompleted { request_id });
                tracing::info!(%request_id, size_bytes = archive.len(), "request completed");
                Self::success_response(&archive)
            }
            Err(err) => {
                self.emit(Event::RequestFailed {
                    request_id,
                    message: err.to_string(),
                });
                tracing::error!(%request_id, error = ?err, "request failed");
                self.error_response(&err)
            }
        }
    }

    fn execute(&self, request_id: Uuid, request: &RawRequest) -> PipelineResult<Vec<u8>> {
        let parts = self.stage("decode", || Self::decode_parts(request))?;
        self.emit(Event::PartsDecoded {
            request_id,
            count: parts.len(),
        });
        if parts.is_empty() {
            return Err(PipelineError::NoFilesUploaded);
        }

        let area = self.stage("workarea", || {
            WorkArea::create(&self.config.work_root, request_id)
        })?;
        let outcome = self.process(request_id, &parts, &area);
        for path in area.cleanup() {
            tracing::warn!(%request_id, path = %path.display(), "working-area cleanup failed");
            self.emit(Event::CleanupFailed {
                request_id,
                path: path.display().to_string(),
            });
        }
        outcome
    }

    fn process(
        &self,
        request_id: Uuid,
        parts: &[FilePart],
        area: &WorkArea,
    ) -> PipelineResult<Vec<u8>> {
        let files = self.stage("materialize", || materialize(parts, area.input_dir()))?;
        self.emit(Event::InputsMaterialized { request_id, files });

        let outcome = self.stage("generate", || {
            generate(area.input_dir(), area.output_dir(), &WebpEncoder)
        })?;
        for failure in &outcome.failures {
            self.metrics.inc_variant_failure();
            self.emit(Event::VariantFailed {
                request_id,
                source: failure.source.clone(),
                target_width: failure.target_width,
                message: failure.message.clone(),
            });
        }
        self.metrics
            .add_variants_generated(u64::try_from(outcome.outputs).unwrap_or(u64::MAX));
        self.emit(Event::VariantsGenerated {
            request_id,
            outputs: outcome.outputs,
        });

        let archive = self.stage("pack", || pack(area.output_dir()))?;
        self.metrics
            .set_last_archive_bytes(i64::try_from(archive.len()).unwrap_or(i64::MAX));
        self.emit(Event::ArchivePacked {
            request_id,
            size_bytes: u64::try_from(archive.len()).unwrap_or(u64::MAX),
        });
        Ok(archive)
    }

    /// Guard chain plus multipart decode. No filesystem access happens here,
    /// so guard failures never create a working area.
    fn decode_parts(request: &RawRequest) -> PipelineResult<Vec<FilePart>> {
        if !request.method.eq_ignore_ascii_case("POST") {
            return Err(PipelineError::MethodNotAllowed {
                method: request.method.clone(),
            });
        }

        let content_type = request.header("content-type");
        if !content_type.is_some_and(|value| value.contains("multipart/form-data")) {
            return Err(PipelineError::BadContentType {
                value: content_type.map(str::to_string),
            });
        }

        let boundary = content_type
            .and_then(extract_boundary)
            .ok_or(PipelineError::MissingBoundary)?;

        let body = BASE64
            .decode(request.body.as_bytes())
            .map_err(|err| PipelineError::InvalidInput {
                field: "body",
                reason: "invalid_base64",
                value: Some(err.to_string()),
            })?;

        Ok(decode(&body, &boundary))
    }

    fn stage<T>(
        &self,
        stage: &'static str,
        run: impl FnOnce() -> PipelineResult<T>,
    ) -> PipelineResult<T> {
        match run() {
            Ok(value) => {
                self.metrics.inc_pipeline_stage(stage, "completed");
                Ok(value)
            }
            Err(err) => {
                self.metrics.inc_pipeline_stage(stage, "failed");
                Err(err)
            }
        }
    }

    fn emit(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _ = self.events.publish(event);
    }

    fn success_response(archive: &[u8]) -> BoundaryResponse {
        BoundaryResponse {
            status_code: 200,
            headers: vec![
                ("Content-Type".to_string(), "application/zip".to_string()),
                (
                    "Content-Disposition".to_string(),
                    format!("attachment; filename=\"{ARCHIVE_FILENAME}\""),
                ),
            ],
            body: BASE64.encode(archive),
            is_base64_encoded: true,
        }
    }

    fn error_response(&self, err: &PipelineError) -> BoundaryResponse {
        let mut body = serde_json::json!({ "error": err.to_string() });
        if self.config.expose_error_detail {
            body["detail"] = serde_json::Value::String(format!("{err:?}"));
        }
        BoundaryResponse {
            status_code: err.status_code(),
            headers: vec![(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )],
            body: body.to_string(),
            is_base64_encoded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::list_entries;
    use anyhow::Result;
    use imgmill_test_support::archives::build_zip;
    use imgmill_test_support::images::{solid_image, tiny_png};
    use imgmill_test_support::multipart::{PartSpec, build_body, content_type_header};
    use std::fs;
    use tempfile::TempDir;

    const BOUNDARY: &str = "----imgmill-test";

    fn orchestrator(work_root: &TempDir) -> Result<Orchestrator> {
        let config = PipelineConfig {
            work_root: work_root.path().to_path_buf(),
            expose_error_detail: false,
        };
        Ok(Orchestrator::new(
            EventBus::with_capacity(64),
            Metrics::new()?,
            config,
        ))
    }

    fn upload_request(parts: &[PartSpec]) -> RawRequest {
        let body = build_body(BOUNDARY, parts);
        RawRequest::new(
            "POST",
            [("Content-Type", content_type_header(BOUNDARY))],
            BASE64.encode(body),
        )
    }

    fn assert_root_empty(root: &TempDir) -> Result<()> {
        assert_eq!(fs::read_dir(root.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn single_jpeg_yields_four_variants_in_the_archive() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let photo = solid_image(100, 100, image::ImageFormat::Jpeg)?;
        let response = service.handle(&upload_request(&[PartSpec::new(
            "photo.jpg",
            "image/jpeg",
            photo,
        )]));

        assert_eq!(response.status_code, 200);
        assert!(response.is_base64_encoded);
        assert!(
            response
                .headers
                .iter()
                .any(|(name, value)| name == "Content-Disposition" && value.contains(".zip"))
        );

        let archive = BASE64.decode(response.body)?;
        let entries = list_entries(&archive)?;
        assert_eq!(entries.len(), 4);
        for (name, data) in &entries {
            assert!(name.starts_with("photo/photo-"));
            let decoded = image::load_from_memory(data)?;
            assert!(decoded.width() <= 100);
        }
        assert_root_empty(&root)
    }

    #[test]
    fn zip_upload_produces_variants_for_every_contained_image() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let archive = build_zip(&[
            ("a.png", tiny_png()?.as_slice()),
            ("b.gif", solid_image(40, 30, image::ImageFormat::Gif)?.as_slice()),
        ])?;
        let response = service.handle(&upload_request(&[PartSpec::new(
            "bundle.zip",
            "application/zip",
            archive,
        )]));

        assert_eq!(response.status_code, 200);
        let result = BASE64.decode(response.body)?;
        let names: Vec<String> = list_entries(&result)?.into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.len(), 8);
        assert!(names.iter().any(|name| name == "a/a-xl.webp"));
        assert!(names.iter().any(|name| name == "b/b-sm.webp"));
        assert_root_empty(&root)
    }

    #[test]
    fn wrong_method_is_rejected_before_any_directories_exist() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let request = RawRequest::new("GET", [("Content-Type", "text/plain")], String::new());
        let response = service.handle(&request);
        assert_eq!(response.status_code, 405);
        assert!(response.body.contains("method not allowed"));
        assert_root_empty(&root)
    }

    #[test]
    fn missing_boundary_is_a_terminal_error() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let request = RawRequest::new(
            "POST",
            [("Content-Type", "multipart/form-data")],
            BASE64.encode(b"irrelevant"),
        );
        let response = service.handle(&request);
        assert_eq!(response.status_code, 500);
        assert!(response.body.contains("missing multipart boundary"));
        assert_root_empty(&root)
    }

    #[test]
    fn field_only_bodies_map_to_no_files_uploaded() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n");
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        let request = RawRequest::new(
            "POST",
            [("Content-Type", content_type_header(BOUNDARY))],
            BASE64.encode(body),
        );

        let response = service.handle(&request);
        assert_eq!(response.status_code, 500);
        assert!(response.body.contains("no files uploaded"));
        assert_root_empty(&root)
    }

    #[test]
    fn non_image_uploads_fail_but_still_clean_up() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let response = service.handle(&upload_request(&[PartSpec::new(
            "notes.txt",
            "text/plain",
            b"plain text".to_vec(),
        )]));
        assert_eq!(response.status_code, 500);
        assert!(response.body.contains("no images found"));
        assert_root_empty(&root)
    }

    #[test]
    fn corrupt_image_alongside_a_valid_one_still_succeeds() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let response = service.handle(&upload_request(&[
            PartSpec::new("broken.png", "image/png", b"garbage".to_vec()),
            PartSpec::new("fine.png", "image/png", tiny_png()?),
        ]));

        assert_eq!(response.status_code, 200);
        let archive = BASE64.decode(response.body)?;
        let entries = list_entries(&archive)?;
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|(name, _)| name.starts_with("fine/")));
        assert_root_empty(&root)
    }

    #[tokio::test]
    async fn successful_requests_emit_events_in_pipeline_order() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let mut stream = service.events.subscribe(None);

        let response = service.handle(&upload_request(&[PartSpec::new(
            "photo.png",
            "image/png",
            tiny_png()?,
        )]));
        assert_eq!(response.status_code, 200);

        let mut kinds = Vec::new();
        for _ in 0..6 {
            let envelope = stream.next().await.expect("event stream open");
            kinds.push(envelope.event.kind());
        }
        assert_eq!(
            kinds,
            vec![
                "request_received",
                "parts_decoded",
                "inputs_materialized",
                "variants_generated",
                "archive_packed",
                "request_completed",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn failed_requests_emit_request_failed() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let mut stream = service.events.subscribe(None);

        let request = RawRequest::new("DELETE", [("Content-Type", "text/plain")], String::new());
        let response = service.handle(&request);
        assert_eq!(response.status_code, 405);

        let first = stream.next().await.expect("event stream open");
        assert_eq!(first.event.kind(), "request_received");
        let second = stream.next().await.expect("event stream open");
        assert_eq!(second.event.kind(), "request_failed");
        Ok(())
    }

    #[test]
    fn error_detail_is_gated_by_configuration() -> Result<()> {
        let root = TempDir::new()?;
        let config = PipelineConfig {
            work_root: root.path().to_path_buf(),
            expose_error_detail: true,
        };
        let service = Orchestrator::new(EventBus::with_capacity(8), Metrics::new()?, config);
        let request = RawRequest::new("GET", [("Content-Type", "text/plain")], String::new());
        let response = service.handle(&request);
        assert!(response.body.contains("detail"));
        assert!(response.body.contains("MethodNotAllowed"));
        Ok(())
    }

    #[test]
    fn invalid_base64_bodies_are_an_input_error() -> Result<()> {
        let root = TempDir::new()?;
        let service = orchestrator(&root)?;
        let request = RawRequest::new(
            "POST",
            [("Content-Type", content_type_header(BOUNDARY))],
            "!!! not base64 !!!".to_string(),
        );
        let response = service.handle(&request);
        assert_eq!(response.status_code, 500);
        assert!(response.body.contains("invalid input"));
        assert_root_empty(&root)
    }
}
