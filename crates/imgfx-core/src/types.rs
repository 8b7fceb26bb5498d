// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the imgfx effect engine.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, GridError};

// ---------------------------------------------------------------------------
// Pixel grid
// ---------------------------------------------------------------------------

/// Number of interleaved 8-bit samples per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channels {
    /// Single luma sample.
    Gray,
    /// Red, green, blue.
    Rgb,
}

impl Channels {
    pub fn count(&self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
        }
    }
}

/// Decoded image buffer: row-major, 8-bit samples, (0, 0) at the top-left.
///
/// The buffer length is always `width * height * channels`; every
/// constructor enforces this, so transforms can index without bounds
/// surprises. Grids are plain owned values: a transform borrows its input
/// and returns a fresh grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl PixelGrid {
    /// Wrap an existing sample buffer, checking its length.
    pub fn new(
        width: u32,
        height: u32,
        channels: Channels,
        data: Vec<u8>,
    ) -> Result<Self, GridError> {
        let expected = buffer_len(width, height, channels)?;
        if data.len() != expected {
            return Err(GridError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// A zero-filled (black) grid.
    pub fn blank(width: u32, height: u32, channels: Channels) -> Result<Self, GridError> {
        let len = buffer_len(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; len],
        })
    }

    /// A single-channel grid where every sample is `value`.
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            channels: Channels::Gray,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// A colour grid where every pixel is `rgb`.
    pub fn uniform_rgb(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            channels: Channels::Rgb,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Samples of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the grid.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + self.channels.count()]
    }

    /// Overwrite the pixel at `(x, y)`. `samples` must hold one value per
    /// channel.
    pub fn put_pixel(&mut self, x: u32, y: u32, samples: &[u8]) {
        let start = self.offset(x, y);
        let n = self.channels.count();
        self.data[start..start + n].copy_from_slice(&samples[..n]);
    }

    /// One row of interleaved samples.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels.count()
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} grid",
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * self.channels.count()
    }
}

fn buffer_len(width: u32, height: u32, channels: Channels) -> Result<usize, GridError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels.count()))
        .ok_or(GridError::DimensionsOverflow { width, height })
}

// ---------------------------------------------------------------------------
// Formats and effects
// ---------------------------------------------------------------------------

/// Raster formats accepted for upload and produced on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Infer the format from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => f.write_str("PNG"),
            Self::Jpeg => f.write_str("JPEG"),
        }
    }
}

/// The closed set of effects a caller may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Grayscale,
    Blur,
    Rotate,
    Mirror,
    FaceDetect,
}

impl Effect {
    pub const ALL: [Effect; 5] = [
        Effect::Grayscale,
        Effect::Blur,
        Effect::Rotate,
        Effect::Mirror,
        Effect::FaceDetect,
    ];

    /// Wire name, as submitted by the upload form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Blur => "blur",
            Self::Rotate => "rotate",
            Self::Mirror => "mirror",
            Self::FaceDetect => "face_detect",
        }
    }
}

impl FromStr for Effect {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Effect::ALL
            .into_iter()
            .find(|effect| effect.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownEffect(s.to_owned()))
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Axis-aligned box around a detected face, in pixel-grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// True when the box has positive size and lies inside a
    /// `width` x `height` grid.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }
}

// ---------------------------------------------------------------------------
// Requests and results
// ---------------------------------------------------------------------------

/// A single upload as handed over by the request-handling layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Raw encoded file contents.
    pub bytes: Vec<u8>,
    /// Filename as declared by the client (untrusted).
    pub filename: String,
    /// Requested effect name, unparsed so that unknown names can be reported.
    pub effect: String,
}

impl UploadRequest {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, effect: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            effect: effect.into(),
        }
    }
}

/// Output of a single transform or detection pipeline.
#[derive(Debug, Clone)]
pub struct EffectResult {
    pub grid: PixelGrid,
    pub effect: Effect,
    /// Boxes found by `face_detect`; empty for every other effect.
    pub faces: Vec<FaceBox>,
}

/// Storage key of a persisted asset (a sanitised filename).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier of the processed counterpart of this asset.
    pub fn processed(&self) -> AssetId {
        AssetId(format!("processed_{}", self.0))
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A buffer persisted in the upload directory. Never mutated after writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAsset {
    pub id: AssetId,
    pub path: PathBuf,
    pub len: u64,
    /// SHA-256 hex digest of the stored bytes.
    pub sha256: String,
    pub stored_at: DateTime<Utc>,
}

/// Result of a successful upload: both persisted assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedUpload {
    pub effect: Effect,
    pub original: StoredAsset,
    pub processed: StoredAsset,
    pub faces: Vec<FaceBox>,
}
