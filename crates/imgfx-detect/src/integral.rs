// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Summed-area tables over a single-channel grid.

use imgfx_core::{Channels, PixelGrid};

/// Integral and squared-integral image of a grayscale grid.
///
/// `sum[y * (width+1) + x]` holds the sum of all samples in the rectangle
/// [0, 0) to (x, y) (exclusive on both axes). Both tables have dimensions
/// `(width+1) x (height+1)` with a zero-padded first row and column, so any
/// rectangle sum is four lookups.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralImage {
    /// Build the tables. Only the first sample of each pixel is read, so
    /// callers should pass a grayscale grid.
    pub fn new(gray: &PixelGrid) -> Self {
        debug_assert_eq!(gray.channels(), Channels::Gray);
        let (w, h) = gray.dimensions();
        let c = gray.channels().count();
        let stride = w as usize + 1;
        let mut sum = vec![0u64; stride * (h as usize + 1)];
        let mut sq_sum = vec![0u64; stride * (h as usize + 1)];
        let samples = gray.as_bytes();

        for y in 0..h as usize {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w as usize {
                let v = samples[(y * w as usize + x) * c] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                let above = y * stride + x + 1;
                sum[idx] = row_sum + sum[above];
                sq_sum[idx] = row_sq + sq_sum[above];
            }
        }

        Self {
            width: w,
            height: h,
            sum,
            sq_sum,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum of samples in the `w x h` rectangle at `(x, y)`. The rectangle must
    /// lie inside the image.
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        lookup(&self.sum, self.width, x, y, w, h)
    }

    /// Sum of squared samples in the `w x h` rectangle at `(x, y)`.
    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        lookup(&self.sq_sum, self.width, x, y, w, h)
    }
}

// S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
fn lookup(table: &[u64], width: u32, x: u32, y: u32, w: u32, h: u32) -> u64 {
    debug_assert!(x + w <= width);
    let stride = width as usize + 1;
    let (x1, y1) = (x as usize, y as usize);
    let (x2, y2) = (x1 + w as usize, y1 + h as usize);
    table[y2 * stride + x2] + table[y1 * stride + x1]
        - table[y1 * stride + x2]
        - table[y2 * stride + x1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: u32, height: u32) -> PixelGrid {
        let data = (0..width * height).map(|i| (i * 13 % 256) as u8).collect();
        PixelGrid::new(width, height, Channels::Gray, data).unwrap()
    }

    fn brute_force(grid: &PixelGrid, x: u32, y: u32, w: u32, h: u32) -> (u64, u64) {
        let mut sum = 0u64;
        let mut sq = 0u64;
        for yy in y..y + h {
            for xx in x..x + w {
                let v = grid.pixel(xx, yy)[0] as u64;
                sum += v;
                sq += v * v;
            }
        }
        (sum, sq)
    }

    #[test]
    fn rect_sums_match_brute_force() {
        let grid = numbered(11, 7);
        let integral = IntegralImage::new(&grid);
        let rects = [
            (0, 0, 11, 7),
            (3, 2, 4, 4),
            (10, 6, 1, 1),
            (0, 5, 11, 2),
            (4, 0, 0, 3),
        ];
        for (x, y, w, h) in rects {
            let (sum, sq) = brute_force(&grid, x, y, w, h);
            assert_eq!(integral.rect_sum(x, y, w, h), sum, "sum at {x},{y} {w}x{h}");
            assert_eq!(integral.rect_sq_sum(x, y, w, h), sq, "sq sum at {x},{y} {w}x{h}");
        }
    }

    #[test]
    fn uniform_image_sum_is_area_times_value() {
        let grid = PixelGrid::uniform_gray(20, 10, 255);
        let integral = IntegralImage::new(&grid);
        assert_eq!(integral.rect_sum(0, 0, 20, 10), 200 * 255);
        assert_eq!(integral.rect_sq_sum(5, 5, 2, 2), 4 * 255 * 255);
    }
}
