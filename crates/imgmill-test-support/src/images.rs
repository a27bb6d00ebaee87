//! Tiny in-memory image fixtures.

use std::io::Cursor;

use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

/// Encode a solid-colour image of the given dimensions into the given format.
///
/// # Errors
///
/// Returns an error if the encoder rejects the buffer.
pub fn solid_image(width: u32, height: u32, format: ImageFormat) -> Result<Vec<u8>> {
    let pixel = Rgba([180_u8, 90, 30, 255]);
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, pixel));
    // JPEG has no alpha channel.
    let image = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), format)?;
    Ok(buffer)
}

/// A small PNG suitable for multipart fixtures.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn tiny_png() -> Result<Vec<u8>> {
    solid_image(64, 48, ImageFormat::Png)
}

/// A small JPEG suitable for multipart fixtures.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn tiny_jpeg() -> Result<Vec<u8>> {
    solid_image(64, 48, ImageFormat::Jpeg)
}

/// A wide PNG, large enough that every ladder width downsizes it.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn wide_png() -> Result<Vec<u8>> {
    solid_image(2_400, 1_200, ImageFormat::Png)
}
