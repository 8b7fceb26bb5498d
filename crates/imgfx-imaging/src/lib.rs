// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgfx-imaging: Decoding/encoding of PNG and JPEG uploads, and the pure
// pixel-grid transforms (grayscale, Gaussian blur, rotate, mirror).

pub mod codec;
pub mod processor;
pub mod transform;

// Re-export the primary entry points so callers can use `imgfx_imaging::decode` etc.
pub use codec::{decode, encode, encode_with_quality};
pub use processor::ImageProcessor;
pub use transform::{blur, grayscale, mirror_horizontal, rotate_right_90};
