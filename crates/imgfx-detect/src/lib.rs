// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgfx-detect: Multi-scale Haar-cascade face detection over a summed-area
// table, optional grouping of overlapping hits, and rectangle annotation.

pub mod annotate;
pub mod cascade;
pub mod detector;
pub mod grouping;
pub mod integral;
mod opencv_xml;

pub use annotate::annotate;
pub use cascade::{ClassifierModel, ModelError};
pub use detector::FaceDetector;
pub use integral::IntegralImage;
