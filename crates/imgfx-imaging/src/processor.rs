// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: a chaining wrapper around the transform library with
// tracing spans, used by the effect dispatcher.

use imgfx_core::error::{DecodeError, EncodeError};
use imgfx_core::{ImageFormat, PixelGrid};
use tracing::{debug, info, instrument};

use crate::{codec, transform};

/// Transform pipeline operating on a single in-memory grid.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping
/// the transformed grid, enabling method chaining.
///
/// ```ignore
/// let png = ImageProcessor::from_bytes(&upload, "jpg")?
///     .rotate_right_90()
///     .grayscale()
///     .blur(4.0)
///     .to_bytes(ImageFormat::Png, 90)?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    grid: PixelGrid,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw upload bytes in the format named by `extension`.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8], extension: &str) -> Result<Self, DecodeError> {
        let grid = codec::decode(data, extension)?;
        debug!(
            width = grid.width(),
            height = grid.height(),
            "Image decoded from bytes"
        );
        Ok(Self { grid })
    }

    /// Wrap an already-decoded grid.
    pub fn from_grid(grid: PixelGrid) -> Self {
        Self { grid }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.grid.width()
    }

    pub fn height(&self) -> u32 {
        self.grid.height()
    }

    pub fn as_grid(&self) -> &PixelGrid {
        &self.grid
    }

    pub fn into_grid(self) -> PixelGrid {
        self.grid
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Convert to single-channel luma.
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        info!("Converting to grayscale");
        Self {
            grid: transform::grayscale(&self.grid),
        }
    }

    /// Gaussian blur with standard deviation `radius`.
    #[instrument(skip(self), fields(radius))]
    pub fn blur(self, radius: f32) -> Self {
        info!(
            radius,
            width = self.grid.width(),
            height = self.grid.height(),
            "Blurring image"
        );
        Self {
            grid: transform::blur(&self.grid, radius),
        }
    }

    /// Quarter turn clockwise; width and height swap.
    #[instrument(skip(self))]
    pub fn rotate_right_90(self) -> Self {
        info!(
            from_w = self.grid.width(),
            from_h = self.grid.height(),
            "Rotating image 90 degrees clockwise"
        );
        Self {
            grid: transform::rotate_right_90(&self.grid),
        }
    }

    #[instrument(skip(self))]
    pub fn mirror(self) -> Self {
        info!("Mirroring image horizontally");
        Self {
            grid: transform::mirror_horizontal(&self.grid),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current grid.
    pub fn to_bytes(&self, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>, EncodeError> {
        codec::encode_with_quality(&self.grid, format, jpeg_quality)
    }
}
