//! HTTP delivery surface for the imgmill service.

pub mod http;
pub mod state;

pub use http::router::ApiServer;
