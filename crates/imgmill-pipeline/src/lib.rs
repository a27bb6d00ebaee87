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

//! Image-variant pipeline for the imgmill service.
//!
//! The pipeline accepts a raw `multipart/form-data` upload, materializes the
//! uploaded files (expanding zip archives) into a per-request working area,
//! renders a fixed ladder of resized WebP variants for every recognized
//! image, and packs the results into a single downloadable archive. The
//! orchestrator owns the working-area lifecycle and guarantees removal on
//! every exit path.

pub mod boundary;
pub mod codec;
pub mod error;
pub mod materialize;
pub mod multipart;
pub mod orchestrator;
pub mod pack;
pub mod variants;
pub mod workarea;

pub use boundary::{BoundaryResponse, RawRequest};
pub use codec::{EncodedVariant, VariantEncoder, WebpEncoder};
pub use error::{PipelineError, PipelineResult};
pub use multipart::FilePart;
pub use orchestrator::Orchestrator;
pub use variants::{SizeSpec, WEBP_QUALITY, size_ladder};
pub use workarea::WorkArea;
