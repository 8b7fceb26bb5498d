// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Layered with the `config` crate: compiled-in defaults, then an optional
// YAML file, then `IMGFX_*` environment variables (`__` separates nested
// keys, e.g. `IMGFX_DETECTOR__SCALE_FACTOR=1.2`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ConfigError;

/// Environment variable naming an alternative configuration file.
pub const CONFIG_FILE_ENV: &str = "IMGFX_CONFIG";

/// Configuration file read when `IMGFX_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "imgfx.yaml";

/// Default upload size limit: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Largest accepted `blur_radius`. Beyond this a blur of any upload within
/// the size limit is indistinguishable from a flat average.
pub const MAX_BLUR_RADIUS: f32 = 1000.0;

/// Service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory receiving original and processed uploads.
    pub upload_dir: PathBuf,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
    /// Cascade classifier used by `face_detect`: OpenCV XML, or JSON for
    /// any other extension.
    pub classifier_path: PathBuf,
    /// Listening port for the request-handling layer.
    pub server_port: u16,
    /// Gaussian sigma used by the `blur` effect.
    pub blur_radius: f32,
    /// JPEG encoder quality (1-100).
    pub jpeg_quality: u8,
    pub detector: DetectorSettings,
    pub annotation: AnnotationSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("static/uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            classifier_path: PathBuf::from("models/haarcascade_frontalface_default.xml"),
            server_port: 5050,
            blur_radius: 4.0,
            jpeg_quality: 90,
            detector: DetectorSettings::default(),
            annotation: AnnotationSettings::default(),
        }
    }
}

/// Sliding-window scan parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Growth factor between consecutive window scales (must be > 1).
    pub scale_factor: f32,
    /// Window step as a fraction of the current window width.
    pub step_ratio: f32,
    /// Smallest window side in pixels; 0 uses the model's base window.
    pub min_size: u32,
    /// Largest window side in pixels; 0 means "until the image is exceeded".
    pub max_size: u32,
    /// Grouping keeps clusters of overlapping hits with more than this many
    /// members; 0 disables grouping and returns every accepted window.
    pub min_neighbors: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            step_ratio: 0.1,
            min_size: 0,
            max_size: 0,
            min_neighbors: 0,
        }
    }
}

/// How detected faces are drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSettings {
    pub stroke_width: u32,
    pub color: [u8; 3],
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            stroke_width: 2,
            color: [0, 255, 0],
        }
    }
}

impl AppConfig {
    /// Load from the file named by `IMGFX_CONFIG` (or `imgfx.yaml`) and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&file)
    }

    /// Load from defaults, then `path` if it exists, then the environment.
    #[instrument(fields(path = %path.display()))]
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("IMGFX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Reject settings that would make every request fail or loop forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be > 0".into()));
        }
        if !(0.0..=MAX_BLUR_RADIUS).contains(&self.blur_radius) {
            return Err(ConfigError::Invalid(format!(
                "blur_radius must be within 0..={MAX_BLUR_RADIUS}, got {}",
                self.blur_radius
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        let detector = &self.detector;
        if !detector.scale_factor.is_finite() || detector.scale_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "detector.scale_factor must be > 1, got {}",
                detector.scale_factor
            )));
        }
        if !detector.step_ratio.is_finite() || detector.step_ratio <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "detector.step_ratio must be > 0, got {}",
                detector.step_ratio
            )));
        }
        if detector.max_size != 0 && detector.max_size < detector.min_size {
            return Err(ConfigError::Invalid(
                "detector.max_size must not be smaller than detector.min_size".into(),
            ));
        }
        if self.annotation.stroke_width == 0 {
            return Err(ConfigError::Invalid("annotation.stroke_width must be > 0".into()));
        }
        Ok(())
    }
}
