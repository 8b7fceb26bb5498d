// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform library: pure functions from one `PixelGrid` to a new one.
// None of them mutate their input or fail on a well-formed grid.

pub mod filter;
pub mod geometry;

pub use filter::{blur, gaussian_kernel, grayscale};
pub use geometry::{mirror_horizontal, rotate_right_90};
