//! Variant generator.
//!
//! Renders the fixed size ladder for every recognized image at the top
//! level of the input area. A corrupt source never aborts the batch:
//! per-variant failures are logged, recorded in the outcome, and processing
//! continues. The request only fails outright when the input area holds no
//! recognized images at all.

use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::VariantEncoder;
use crate::error::{PipelineError, PipelineResult};

/// Lossy WebP quality used for every variant.
pub const WEBP_QUALITY: f32 = 85.0;

/// Extensions treated as source images, matched case-insensitively.
const RECOGNIZED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// One rung of the output size ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSpec {
    /// Upper bound on output width; never enlarges past the source.
    pub width: u32,
    /// Filename suffix appended to the source basename.
    pub suffix: &'static str,
}

/// The fixed, ordered output ladder.
#[must_use]
pub const fn size_ladder() -> [SizeSpec; 4] {
    [
        SizeSpec {
            width: 1_920,
            suffix: "-xl",
        },
        SizeSpec {
            width: 1_280,
            suffix: "-lg",
        },
        SizeSpec {
            width: 768,
            suffix: "-md",
        },
        SizeSpec {
            width: 480,
            suffix: "-sm",
        },
    ]
}

/// A variant that failed to render and was skipped.
#[derive(Debug, Clone)]
pub struct VariantFailure {
    /// Source image filename the variant derives from.
    pub source: String,
    /// Target width of the failed variant.
    pub target_width: u32,
    /// Failure detail.
    pub message: String,
}

/// Result of a generator run.
#[derive(Debug)]
pub struct GenerateOutcome {
    /// Number of variant files written.
    pub outputs: usize,
    /// Variants skipped because they failed to render.
    pub failures: Vec<VariantFailure>,
}

/// Render the size ladder for every recognized image directly in
/// `input_dir`.
///
/// Only top-level entries are scanned; subdirectories left behind by
/// expanded archives are ignored, which also keeps distinct sources from
/// sharing a basename and overwriting each other's variants. Images are
/// processed in lexical filename order and sizes in ladder order, so output
/// is deterministic. Each image's variants land under
/// `output_dir/{basename}/{basename}{suffix}.webp`.
///
/// # Errors
///
/// Returns `NoImagesFound` when the input area holds no recognized images,
/// or an IO error when the area itself cannot be listed.
pub fn generate(
    input_dir: &Path,
    output_dir: &Path,
    encoder: &dyn VariantEncoder,
) -> PipelineResult<GenerateOutcome> {
    let images = collect_images(input_dir)?;
    if images.is_empty() {
        return Err(PipelineError::NoImagesFound);
    }

    // Pre-create every destination folder before any resize work.
    for image in &images {
        let folder = output_dir.join(&image.basename);
        fs::create_dir_all(&folder)
            .map_err(|source| PipelineError::io("generate.create_folder", &folder, source))?;
    }

    let mut outputs = 0;
    let mut failures = Vec::new();

    for image in &images {
        let bytes = match fs::read(&image.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                for spec in size_ladder() {
                    record_failure(&mut failures, image, spec.width, &err.to_string());
                }
                continue;
            }
        };

        for spec in size_ladder() {
            match encoder.encode(&bytes, &image.path, spec.width, WEBP_QUALITY) {
                Ok(variant) => {
                    let destination = output_dir
                        .join(&image.basename)
                        .join(format!("{}{}.webp", image.basename, spec.suffix));
                    fs::write(&destination, &variant.data).map_or_else(
                        |err| record_failure(&mut failures, image, spec.width, &err.to_string()),
                        |()| outputs += 1,
                    );
                }
                Err(err) => record_failure(&mut failures, image, spec.width, &err.to_string()),
            }
        }
    }

    Ok(GenerateOutcome { outputs, failures })
}

struct SourceImage {
    path: PathBuf,
    filename: String,
    basename: String,
}

fn collect_images(input_dir: &Path) -> PipelineResult<Vec<SourceImage>> {
    let mut images = Vec::new();
    let entries = fs::read_dir(input_dir)
        .map_err(|source| PipelineError::io("generate.collect", input_dir, source))?;
    for entry in entries {
        let entry = entry
            .map_err(|source| PipelineError::io("generate.collect", input_dir, source))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let recognized = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                RECOGNIZED_EXTENSIONS
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(ext))
            });
        if !recognized {
            continue;
        }
        let Some(basename) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        images.push(SourceImage {
            filename: entry.file_name().to_string_lossy().into_owned(),
            basename: basename.to_string(),
            path,
        });
    }
    images.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(images)
}

fn record_failure(
    failures: &mut Vec<VariantFailure>,
    image: &SourceImage,
    target_width: u32,
    message: &str,
) {
    tracing::warn!(source = %image.filename, target_width, message, "variant skipped");
    failures.push(VariantFailure {
        source: image.filename.clone(),
        target_width,
        message: message.to_string(),
    });
}
