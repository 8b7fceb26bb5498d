// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-pixel and neighbourhood filters: luma conversion and Gaussian blur.

use image::{ImageBuffer, Luma, Rgb32FImage};
use imageproc::filter::separable_filter_equal;
use imgfx_core::{Channels, PixelGrid};

/// Convert to single-channel luma using the ITU-R 601-2 weights
/// `L = (299 R + 587 G + 114 B) / 1000`, rounded to nearest.
///
/// Single-channel input is returned unchanged, so the conversion is
/// idempotent.
pub fn grayscale(grid: &PixelGrid) -> PixelGrid {
    match grid.channels() {
        Channels::Gray => grid.clone(),
        Channels::Rgb => {
            let luma: Vec<u8> = grid
                .as_bytes()
                .chunks_exact(3)
                .map(|px| {
                    let weighted = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                    ((weighted + 500) / 1000) as u8
                })
                .collect();
            PixelGrid::new(grid.width(), grid.height(), Channels::Gray, luma)
                .expect("one luma sample per source pixel")
        }
    }
}

/// Normalised 1-D Gaussian kernel for standard deviation `sigma`.
///
/// The kernel spans `2 * ceil(3 * sigma) + 1` taps and sums to 1. The
/// half-width is capped at `max_half`; past the size of the image a wider
/// kernel only replicates edge pixels further.
pub fn gaussian_kernel(sigma: f32, max_half: u32) -> Vec<f32> {
    let half = (3.0 * sigma).ceil().clamp(1.0, max_half.max(1) as f32) as u32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * half)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-(x * x) / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

/// Gaussian blur with standard deviation `radius`.
///
/// Runs imageproc's separable filter (horizontal, then vertical) over an
/// `f32` copy of the grid and rounds back to 8 bits once at the end. Samples
/// outside the grid take the value of the nearest edge pixel, so a uniform
/// grid is returned unchanged. A non-positive or non-finite radius is a no-op.
pub fn blur(grid: &PixelGrid, radius: f32) -> PixelGrid {
    if !radius.is_finite() || radius <= 0.0 || grid.is_empty() {
        return grid.clone();
    }

    let (width, height) = grid.dimensions();
    let kernel = gaussian_kernel(radius, width.max(height));
    let samples: Vec<f32> = grid.as_bytes().iter().map(|&v| f32::from(v)).collect();

    let filtered = match grid.channels() {
        Channels::Gray => {
            let image = ImageBuffer::<Luma<f32>, _>::from_raw(width, height, samples)
                .expect("one sample per gray pixel");
            separable_filter_equal(&image, &kernel).into_raw()
        }
        Channels::Rgb => {
            let image = Rgb32FImage::from_raw(width, height, samples)
                .expect("three samples per rgb pixel");
            separable_filter_equal(&image, &kernel).into_raw()
        }
    };

    let out = filtered
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    PixelGrid::new(width, height, grid.channels(), out).expect("blur preserves buffer length")
}
