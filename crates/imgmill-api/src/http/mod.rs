//! HTTP surface modules (router, handlers, middleware).

/// Problem response helpers and error types.
pub mod errors;
/// Health and diagnostics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
/// Variant processing endpoint.
pub mod variants;
