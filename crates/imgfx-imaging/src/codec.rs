// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image codec: decodes uploaded PNG/JPEG bytes into a `PixelGrid` and
// encodes grids back, using the `image` crate.
//
// Channel policy: luma sources (with or without alpha, 8 or 16 bit) decode to
// a single-channel grid; everything else decodes to RGB. Alpha is dropped.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, GrayImage, RgbImage};
use imgfx_core::error::{DecodeError, EncodeError};
use imgfx_core::{Channels, ImageFormat, PixelGrid};
use tracing::{debug, instrument};

/// JPEG quality used by [`encode`].
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Decode `bytes` as the format named by `declared_extension`.
///
/// The decoder is pinned to the declared format: a PNG uploaded as `.jpg`
/// fails with `CorruptData` instead of being sniffed.
#[instrument(skip(bytes), fields(data_len = bytes.len()))]
pub fn decode(bytes: &[u8], declared_extension: &str) -> Result<PixelGrid, DecodeError> {
    let format = ImageFormat::from_extension(declared_extension)
        .ok_or_else(|| DecodeError::UnsupportedFormat(declared_extension.to_owned()))?;

    if bytes.is_empty() {
        return Err(DecodeError::CorruptData("empty image buffer".into()));
    }

    let image = image::load_from_memory_with_format(bytes, image_format(format))
        .map_err(|err| DecodeError::CorruptData(err.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(DecodeError::CorruptData(format!(
            "image has zero dimensions ({}x{})",
            image.width(),
            image.height()
        )));
    }

    let grid = from_dynamic(image);
    debug!(
        width = grid.width(),
        height = grid.height(),
        channels = grid.channels().count(),
        %format,
        "Image decoded"
    );
    Ok(grid)
}

/// Encode with the default JPEG quality.
pub fn encode(grid: &PixelGrid, format: ImageFormat) -> Result<Vec<u8>, EncodeError> {
    encode_with_quality(grid, format, DEFAULT_JPEG_QUALITY)
}

/// Encode `grid` as `format`. `jpeg_quality` (1-100) is ignored for PNG.
#[instrument(skip(grid), fields(width = grid.width(), height = grid.height()))]
pub fn encode_with_quality(
    grid: &PixelGrid,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    let image = to_dynamic(grid);
    let mut buffer = Vec::new();

    let written = match format {
        ImageFormat::Png => image.write_with_encoder(PngEncoder::new(&mut buffer)),
        ImageFormat::Jpeg => image.write_with_encoder(JpegEncoder::new_with_quality(
            &mut buffer,
            jpeg_quality.clamp(1, 100),
        )),
    };
    written.map_err(|err| EncodeError::Failed {
        format,
        detail: err.to_string(),
    })?;

    debug!(bytes = buffer.len(), %format, "Image encoded");
    Ok(buffer)
}

// -- Conversions --------------------------------------------------------------

/// Convert a decoded `DynamicImage` according to the channel policy.
pub fn from_dynamic(image: DynamicImage) -> PixelGrid {
    match image {
        DynamicImage::ImageLuma8(gray) => from_gray_image(gray),
        luma @ (DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)) => from_gray_image(luma.to_luma8()),
        DynamicImage::ImageRgb8(rgb) => from_rgb_image(rgb),
        other => from_rgb_image(other.to_rgb8()),
    }
}

pub fn from_gray_image(image: GrayImage) -> PixelGrid {
    let (width, height) = image.dimensions();
    PixelGrid::new(width, height, Channels::Gray, image.into_raw())
        .expect("GrayImage buffer length matches its dimensions")
}

pub fn from_rgb_image(image: RgbImage) -> PixelGrid {
    let (width, height) = image.dimensions();
    PixelGrid::new(width, height, Channels::Rgb, image.into_raw())
        .expect("RgbImage buffer length matches its dimensions")
}

/// Copy a grid into the matching `DynamicImage` variant.
pub fn to_dynamic(grid: &PixelGrid) -> DynamicImage {
    match grid.channels() {
        Channels::Gray => DynamicImage::ImageLuma8(
            GrayImage::from_raw(grid.width(), grid.height(), grid.as_bytes().to_vec())
                .expect("grid buffer length matches its dimensions"),
        ),
        Channels::Rgb => DynamicImage::ImageRgb8(to_rgb_image(grid)),
    }
}

/// Copy a grid into an `RgbImage`, replicating luma into all three channels
/// for single-channel grids.
pub fn to_rgb_image(grid: &PixelGrid) -> RgbImage {
    let data = match grid.channels() {
        Channels::Rgb => grid.as_bytes().to_vec(),
        Channels::Gray => grid.as_bytes().iter().flat_map(|&v| [v, v, v]).collect(),
    };
    RgbImage::from_raw(grid.width(), grid.height(), data)
        .expect("grid buffer length matches its dimensions")
}

fn image_format(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
    }
}

// -- Tests --------------------------------------------------------------------
