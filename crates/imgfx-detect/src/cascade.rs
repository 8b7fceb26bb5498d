// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cascade classifier model: a boosted cascade of Haar-like rectangle
// features. Two file layouts load into the same model: OpenCV's cascade XML
// (`*.xml`, see `opencv_xml`) and a JSON rendering of the same structure:
//
//   {
//     "width": 24, "height": 24,
//     "features": [
//       { "rects": [ {"x":6,"y":4,"width":12,"height":9,"weight":-1.0}, ... ] }
//     ],
//     "stages": [
//       { "threshold": -1.25,
//         "weak_classifiers": [
//           {"feature":0,"threshold":-0.03,"left":0.84,"right":-0.83}
//         ] }
//     ]
//   }
//
// The model is loaded once, validated, and then shared read-only.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::integral::IntegralImage;
use crate::opencv_xml;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read classifier {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse classifier: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to parse classifier XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("invalid classifier: {0}")]
    Invalid(String),
}

/// One weighted rectangle of a Haar-like feature, in base-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub rects: Vec<WeightedRect>,
}

/// Decision stump over one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeakClassifier {
    /// Index into `ClassifierModel::features`.
    pub feature: usize,
    /// Compared against the variance-normalised feature value.
    pub threshold: f32,
    /// Vote when the feature value is below `threshold`.
    pub left: f32,
    /// Vote otherwise.
    pub right: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// The window passes the stage when the summed votes reach this value.
    pub threshold: f32,
    pub weak_classifiers: Vec<WeakClassifier>,
}

/// A trained cascade. Immutable after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    /// Base window width in pixels.
    pub width: u32,
    /// Base window height in pixels.
    pub height: u32,
    pub features: Vec<Feature>,
    pub stages: Vec<Stage>,
}

impl ClassifierModel {
    /// Read and validate a cascade from disk. Files ending in `.xml` are
    /// read as OpenCV cascades, anything else as JSON.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_xml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        let model = if is_xml {
            let text = std::str::from_utf8(&bytes)
                .map_err(|e| ModelError::Invalid(format!("classifier XML is not UTF-8: {e}")))?;
            Self::from_opencv_xml(text)?
        } else {
            Self::from_json(&bytes)?
        };
        info!(
            window_w = model.width,
            window_h = model.height,
            stages = model.stages.len(),
            features = model.features.len(),
            "Classifier loaded"
        );
        Ok(model)
    }

    /// Parse and validate a JSON cascade.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let model: ClassifierModel = serde_json::from_slice(bytes)?;
        model.validate()?;
        Ok(model)
    }

    /// Parse and validate an OpenCV `opencv-cascade-classifier` document.
    pub fn from_opencv_xml(text: &str) -> Result<Self, ModelError> {
        let model = opencv_xml::parse(text)?;
        model.validate()?;
        Ok(model)
    }

    /// True when the model cannot reject anything (no stages).
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Check structural soundness: positive window, at least one non-empty
    /// stage, every feature index in range, every rectangle inside the base
    /// window, all numbers finite.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.width == 0 || self.height == 0 {
            return Err(ModelError::Invalid(format!(
                "base window must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.stages.is_empty() {
            return Err(ModelError::Invalid("cascade has no stages".into()));
        }

        for (i, feature) in self.features.iter().enumerate() {
            if feature.rects.is_empty() {
                return Err(ModelError::Invalid(format!("feature {i} has no rectangles")));
            }
            for rect in &feature.rects {
                if rect.width == 0
                    || rect.height == 0
                    || rect.x + rect.width > self.width
                    || rect.y + rect.height > self.height
                {
                    return Err(ModelError::Invalid(format!(
                        "feature {i} rectangle {rect:?} lies outside the {}x{} window",
                        self.width, self.height
                    )));
                }
                if !rect.weight.is_finite() {
                    return Err(ModelError::Invalid(format!("feature {i} has a non-finite weight")));
                }
            }
        }

        for (s, stage) in self.stages.iter().enumerate() {
            if stage.weak_classifiers.is_empty() {
                return Err(ModelError::Invalid(format!("stage {s} has no weak classifiers")));
            }
            if !stage.threshold.is_finite() {
                return Err(ModelError::Invalid(format!("stage {s} has a non-finite threshold")));
            }
            for weak in &stage.weak_classifiers {
                if weak.feature >= self.features.len() {
                    return Err(ModelError::Invalid(format!(
                        "stage {s} references feature {} but only {} exist",
                        weak.feature,
                        self.features.len()
                    )));
                }
                let finite = weak.threshold.is_finite()
                    && weak.left.is_finite()
                    && weak.right.is_finite();
                if !finite {
                    return Err(ModelError::Invalid(format!(
                        "stage {s} has a non-finite weak classifier"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rescale every feature for a `window_w x window_h` window.
    pub(crate) fn scaled(&self, window_w: u32, window_h: u32) -> ScaledCascade<'_> {
        let sx = window_w as f64 / self.width as f64;
        let sy = window_h as f64 / self.height as f64;
        let features = self
            .features
            .iter()
            .map(|feature| scale_feature(feature, sx, sy, window_w, window_h))
            .collect();
        ScaledCascade {
            model: self,
            features,
            window_w,
            window_h,
            inv_area: 1.0 / (window_w as f64 * window_h as f64),
        }
    }
}

// -- Scaled evaluation --------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct ScaledRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

/// The cascade with features resized for one window size.
pub(crate) struct ScaledCascade<'a> {
    model: &'a ClassifierModel,
    features: Vec<Vec<ScaledRect>>,
    window_w: u32,
    window_h: u32,
    inv_area: f64,
}

impl ScaledCascade<'_> {
    /// Run the stages on the window whose top-left corner is `(x, y)`.
    /// Returns `false` at the first failing stage.
    pub(crate) fn accepts(&self, integral: &IntegralImage, x: u32, y: u32) -> bool {
        let (w, h) = (self.window_w, self.window_h);
        let mean = integral.rect_sum(x, y, w, h) as f64 * self.inv_area;
        let variance = integral.rect_sq_sum(x, y, w, h) as f64 * self.inv_area - mean * mean;
        let std_dev = if variance > 1.0 { variance.sqrt() } else { 1.0 };

        for stage in &self.model.stages {
            let mut votes = 0f64;
            for weak in &stage.weak_classifiers {
                let value = self.feature_value(weak.feature, integral, x, y);
                votes += if value < weak.threshold as f64 * std_dev {
                    weak.left as f64
                } else {
                    weak.right as f64
                };
            }
            if votes < stage.threshold as f64 {
                return false;
            }
        }
        true
    }

    fn feature_value(&self, feature: usize, integral: &IntegralImage, x: u32, y: u32) -> f64 {
        let sum: f64 = self.features[feature]
            .iter()
            .map(|r| r.weight * integral.rect_sum(x + r.x, y + r.y, r.width, r.height) as f64)
            .sum();
        sum * self.inv_area
    }
}

/// Scale each rectangle, keep it inside the window, and re-balance the first
/// weight so that a flat patch still evaluates to zero after rounding.
fn scale_feature(
    feature: &Feature,
    sx: f64,
    sy: f64,
    window_w: u32,
    window_h: u32,
) -> Vec<ScaledRect> {
    let mut rects: Vec<ScaledRect> = feature
        .rects
        .iter()
        .map(|r| {
            let x = ((r.x as f64 * sx).round() as u32).min(window_w - 1);
            let y = ((r.y as f64 * sy).round() as u32).min(window_h - 1);
            let width = ((r.width as f64 * sx).round() as u32).clamp(1, window_w - x);
            let height = ((r.height as f64 * sy).round() as u32).clamp(1, window_h - y);
            ScaledRect {
                x,
                y,
                width,
                height,
                weight: r.weight as f64,
            }
        })
        .collect();

    if rects.len() > 1 {
        let rest: f64 = rects[1..]
            .iter()
            .map(|r| r.weight * (r.width * r.height) as f64)
            .sum();
        let first_area = (rects[0].width * rects[0].height) as f64;
        rects[0].weight = -rest / first_area;
    }
    rects
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use imgfx_core::PixelGrid;

    /// An 8x8 cascade that fires on "dark top half, bright bottom half".
    pub(crate) fn edge_model() -> ClassifierModel {
        ClassifierModel {
            width: 8,
            height: 8,
            features: vec![Feature {
                rects: vec![
                    WeightedRect { x: 0, y: 0, width: 8, height: 4, weight: -1.0 },
                    WeightedRect { x: 0, y: 4, width: 8, height: 4, weight: 1.0 },
                ],
            }],
            stages: vec![Stage {
                threshold: 0.0,
                weak_classifiers: vec![WeakClassifier {
                    feature: 0,
                    threshold: 0.5,
                    left: -1.0,
                    right: 1.0,
                }],
            }],
        }
    }

    #[test]
    fn json_round_trip_preserves_model() {
        let model = edge_model();
        let json = serde_json::to_vec(&model).unwrap();
        assert_eq!(ClassifierModel::from_json(&json).unwrap(), model);
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.json");
        std::fs::write(&path, serde_json::to_vec(&edge_model()).unwrap()).unwrap();
        assert_eq!(ClassifierModel::load(&path).unwrap(), edge_model());
    }

    #[test]
    fn load_picks_the_xml_reader_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let xml = r#"<opencv_storage><cascade>
            <height>8</height><width>8</width>
            <stages><_><stageThreshold>0.</stageThreshold><weakClassifiers>
              <_><internalNodes>0 -1 0 0.5</internalNodes><leafValues>-1. 1.</leafValues></_>
            </weakClassifiers></_></stages>
            <features><_><rects><_>0 0 8 4 -1.</_><_>0 4 8 4 1.</_></rects></_></features>
            </cascade></opencv_storage>"#;

        let path = dir.path().join("haarcascade_edge.XML");
        std::fs::write(&path, xml).unwrap();
        assert_eq!(ClassifierModel::load(&path).unwrap(), edge_model());

        // The same document under a JSON name goes to the JSON reader.
        let misnamed = dir.path().join("edge.json");
        std::fs::write(&misnamed, xml).unwrap();
        assert!(matches!(
            ClassifierModel::load(&misnamed),
            Err(ModelError::Parse(_))
        ));
    }

    #[test]
    fn xml_model_is_validated() {
        let xml = r#"<opencv_storage><cascade>
            <height>8</height><width>8</width>
            <stages><_><stageThreshold>0.</stageThreshold><weakClassifiers>
              <_><internalNodes>0 -1 4 0.5</internalNodes><leafValues>-1. 1.</leafValues></_>
            </weakClassifiers></_></stages>
            <features><_><rects><_>0 0 8 4 -1.</_></rects></_></features>
            </cascade></opencv_storage>"#;
        let err = ClassifierModel::from_opencv_xml(xml).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(ref m) if m.contains("feature 4")), "{err}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClassifierModel::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            ClassifierModel::from_json(b"{\"width\": 24"),
            Err(ModelError::Parse(_))
        ));
    }

    #[test]
    fn validation_catches_structural_errors() {
        let mut model = edge_model();
        model.stages.clear();
        assert!(matches!(model.validate(), Err(ModelError::Invalid(_))));

        let mut model = edge_model();
        model.stages[0].weak_classifiers[0].feature = 3;
        assert!(matches!(model.validate(), Err(ModelError::Invalid(_))));

        let mut model = edge_model();
        model.features[0].rects[1].y = 6;
        assert!(matches!(model.validate(), Err(ModelError::Invalid(_))));

        let mut model = edge_model();
        model.width = 0;
        assert!(model.validate().is_err());
    }

    #[test]
    fn scaled_rects_stay_inside_window() {
        let model = edge_model();
        let scaled = model.scaled(13, 13);
        for rect in &scaled.features[0] {
            assert!(rect.x + rect.width <= 13);
            assert!(rect.y + rect.height <= 13);
        }
    }

    #[test]
    fn cascade_accepts_pattern_and_rejects_flat_patch() {
        let model = edge_model();
        let scaled = model.scaled(8, 8);

        let mut grid = PixelGrid::uniform_gray(8, 8, 255);
        for y in 0..4 {
            for x in 0..8 {
                grid.put_pixel(x, y, &[0]);
            }
        }
        assert!(scaled.accepts(&IntegralImage::new(&grid), 0, 0));

        let flat = PixelGrid::uniform_gray(8, 8, 90);
        assert!(!scaled.accepts(&IntegralImage::new(&flat), 0, 0));

        // Inverted pattern: bright top, dark bottom.
        let inverted = imgfx_imaging::rotate_right_90(&imgfx_imaging::rotate_right_90(&grid));
        assert!(!scaled.accepts(&IntegralImage::new(&inverted), 0, 0));
    }
}
