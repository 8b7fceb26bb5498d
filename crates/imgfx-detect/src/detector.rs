// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-scale sliding-window face detector.
//
// Pipeline:
//   1. Convert to grayscale and build the summed-area tables
//   2. Grow the window geometrically from the base (or minimum) size until it
//      no longer fits the image (or exceeds the maximum size)
//   3. Slide the window with a step proportional to its width and run the
//      cascade, rejecting at the first failing stage
//   4. Emit accepted windows in scan order; group them only when
//      `min_neighbors > 0`

use std::sync::Arc;

use imgfx_core::error::DetectionError;
use imgfx_core::{DetectorSettings, FaceBox, PixelGrid};
use imgfx_imaging::grayscale;
use tracing::{debug, info, instrument, warn};

use crate::cascade::ClassifierModel;
use crate::grouping::{GROUP_EPS, group_boxes};
use crate::integral::IntegralImage;

/// Haar-cascade detector bound to a shared, read-only model.
///
/// Cloning is cheap; every clone reads the same `Arc<ClassifierModel>`.
#[derive(Debug, Clone)]
pub struct FaceDetector {
    model: Option<Arc<ClassifierModel>>,
    settings: DetectorSettings,
}

impl FaceDetector {
    pub fn new(model: Arc<ClassifierModel>, settings: DetectorSettings) -> Self {
        Self {
            model: Some(model),
            settings,
        }
    }

    /// A detector with no model; every call fails with `ModelNotLoaded`.
    pub fn unloaded(settings: DetectorSettings) -> Self {
        Self {
            model: None,
            settings,
        }
    }

    pub fn model(&self) -> Option<&ClassifierModel> {
        self.model.as_deref()
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Scan `grid` (colour grids are converted to luma first) and return the
    /// accepted windows. No faces is an empty vector, not an error.
    #[instrument(skip_all, fields(width = grid.width(), height = grid.height()))]
    pub fn detect(&self, grid: &PixelGrid) -> Result<Vec<FaceBox>, DetectionError> {
        let model = match self.model.as_deref() {
            Some(model) if !model.is_empty() => model,
            _ => return Err(DetectionError::ModelNotLoaded),
        };
        if grid.is_empty() {
            return Err(DetectionError::EmptyImage);
        }

        let gray = grayscale(grid);
        let integral = IntegralImage::new(&gray);
        let raw = self.scan(model, &integral);

        let faces = if self.settings.min_neighbors > 0 {
            let grouped = group_boxes(
                &raw,
                self.settings.min_neighbors,
                GROUP_EPS,
                grid.width(),
                grid.height(),
            );
            debug!(raw = raw.len(), grouped = grouped.len(), "Grouped detections");
            grouped
        } else {
            raw
        };

        info!(faces = faces.len(), "Face detection complete");
        Ok(faces)
    }

    fn scan(&self, model: &ClassifierModel, integral: &IntegralImage) -> Vec<FaceBox> {
        let (img_w, img_h) = (integral.width(), integral.height());
        let settings = &self.settings;

        let factor = if settings.scale_factor.is_finite() && settings.scale_factor > 1.0 {
            settings.scale_factor as f64
        } else {
            warn!(
                scale_factor = settings.scale_factor,
                "Scale factor must be > 1; falling back to 1.1"
            );
            1.1
        };
        let step_ratio = if settings.step_ratio.is_finite() && settings.step_ratio > 0.0 {
            settings.step_ratio as f64
        } else {
            0.1
        };

        let base_side = model.width.min(model.height) as f64;
        let mut scale = if settings.min_size as f64 > base_side {
            settings.min_size as f64 / base_side
        } else {
            1.0
        };

        let mut detections = Vec::new();
        let mut scales = 0usize;
        let mut windows = 0usize;
        let mut last_size = (0, 0);

        loop {
            let win_w = ((model.width as f64 * scale).round() as u32).max(1);
            let win_h = ((model.height as f64 * scale).round() as u32).max(1);
            if win_w > img_w || win_h > img_h {
                break;
            }
            if settings.max_size != 0 && win_w.max(win_h) > settings.max_size {
                break;
            }
            scale *= factor;

            // Rounding can map two consecutive scales to the same window.
            if (win_w, win_h) == last_size {
                continue;
            }
            last_size = (win_w, win_h);
            scales += 1;

            let step = ((win_w as f64 * step_ratio).floor() as usize).max(1);
            let cascade = model.scaled(win_w, win_h);

            for y in (0..=img_h - win_h).step_by(step) {
                for x in (0..=img_w - win_w).step_by(step) {
                    windows += 1;
                    if cascade.accepts(integral, x, y) {
                        detections.push(FaceBox::new(x, y, win_w, win_h));
                    }
                }
            }
        }

        debug!(scales, windows, hits = detections.len(), "Sliding-window scan finished");
        detections
    }
}
