//! Resize and encode capability behind a trait seam.
//!
//! The generator depends on [`VariantEncoder`] rather than a concrete codec
//! so tests can substitute failing or counting encoders. The production
//! implementation decodes with the `image` crate, downsizes with Lanczos3
//! when the source exceeds the width bound, and encodes lossy WebP.

use std::path::Path;

use image::imageops::FilterType;

use crate::error::{PipelineError, PipelineResult};

/// Encoded variant bytes plus the final dimensions.
#[derive(Debug, Clone)]
pub struct EncodedVariant {
    /// WebP payload.
    pub data: Vec<u8>,
    /// Final pixel width.
    pub width: u32,
    /// Final pixel height.
    pub height: u32,
}

/// Capability to turn source image bytes into one bounded WebP variant.
pub trait VariantEncoder: Send + Sync {
    /// Decode `source`, fit it within `max_width` preserving aspect ratio
    /// without enlargement, and encode at the given quality.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot be decoded or encoded.
    fn encode(
        &self,
        source: &[u8],
        source_path: &Path,
        max_width: u32,
        quality: f32,
    ) -> PipelineResult<EncodedVariant>;
}

/// Production encoder backed by the `image` and `webp` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpEncoder;

impl VariantEncoder for WebpEncoder {
    fn encode(
        &self,
        source: &[u8],
        source_path: &Path,
        max_width: u32,
        quality: f32,
    ) -> PipelineResult<EncodedVariant> {
        let decoded = image::load_from_memory(source)
            .map_err(|err| PipelineError::image("encode.decode", source_path, err.to_string()))?;

        let resized = if decoded.width() > max_width {
            decoded.resize(max_width, u32::MAX, FilterType::Lanczos3)
        } else {
            decoded
        };

        let rgba = resized.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(quality);

        Ok(EncodedVariant {
            data: encoded.to_vec(),
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use imgmill_test_support::images::{solid_image, tiny_png, wide_png};

    #[test]
    fn small_sources_are_never_enlarged() -> Result<()> {
        let source = tiny_png()?;
        let variant = WebpEncoder.encode(&source, Path::new("tiny.png"), 1_920, 85.0)?;
        assert_eq!(variant.width, 64);
        assert_eq!(variant.height, 48);
        Ok(())
    }

    #[test]
    fn wide_sources_are_bounded_with_aspect_preserved() -> Result<()> {
        let source = wide_png()?;
        let variant = WebpEncoder.encode(&source, Path::new("wide.png"), 480, 85.0)?;
        assert_eq!(variant.width, 480);
        // 2400x1200 halves its width four more times; aspect holds within a pixel.
        assert!(variant.height.abs_diff(240) <= 1);
        Ok(())
    }

    #[test]
    fn output_is_decodable_webp() -> Result<()> {
        let source = solid_image(300, 200, image::ImageFormat::Jpeg)?;
        let variant = WebpEncoder.encode(&source, Path::new("photo.jpg"), 768, 85.0)?;
        let decoded = image::load_from_memory(&variant.data)?;
        assert_eq!(decoded.width(), 300);
        Ok(())
    }

    #[test]
    fn corrupt_sources_report_an_image_error() {
        let err = WebpEncoder
            .encode(b"not an image", Path::new("broken.png"), 480, 85.0)
            .expect_err("corrupt input must fail");
        assert!(matches!(err, PipelineError::Image { .. }));
    }
}
