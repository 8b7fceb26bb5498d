// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lossless geometric transforms: quarter-turn rotation and horizontal mirror.

use imgfx_core::PixelGrid;

use crate::codec::{from_dynamic, to_dynamic};

/// Rotate a quarter turn clockwise.
///
/// A `W x H` grid becomes `H x W`; output pixel `(x, y)` is input pixel
/// `(y, H - 1 - x)`, so the bottom-left input pixel lands at the top-left.
pub fn rotate_right_90(grid: &PixelGrid) -> PixelGrid {
    from_dynamic(to_dynamic(grid).rotate90())
}

/// Reflect columns: pixel `(x, y)` moves to `(W - 1 - x, y)`.
pub fn mirror_horizontal(grid: &PixelGrid) -> PixelGrid {
    from_dynamic(to_dynamic(grid).fliph())
}
