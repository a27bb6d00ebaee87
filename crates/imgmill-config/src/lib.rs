#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Typed configuration for the imgmill service.
//!
//! Layout: `model.rs` (typed config sections and defaults), `loader.rs`
//! (environment-variable loader), `error.rs` (validation errors).

pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_PREFIX, load_from_env};
pub use model::{HttpConfig, ImgmillConfig, LogFormatSetting, LoggingSettings, PipelineConfig};
