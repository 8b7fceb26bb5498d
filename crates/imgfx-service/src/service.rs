// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: owns the validated configuration, the shared face
// detector, and the asset store, and runs one upload end to end.
//
// All fields are cheap to clone (Arc-backed or plain paths), so a clone can
// be moved onto a worker thread per request.

use std::sync::Arc;

use imgfx_core::error::{ConfigError, StorageError};
use imgfx_core::{AppConfig, CoreError, Effect, ProcessedUpload, UploadRequest};
use imgfx_detect::{ClassifierModel, FaceDetector, ModelError};
use imgfx_store::{AssetStore, accept};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::pipeline::EffectPipeline;

/// Errors that stop the service from starting. None of these are
/// recoverable per request.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("face classifier unavailable: {0}")]
    Model(#[from] ModelError),

    #[error("upload directory unusable: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct EffectService {
    config: Arc<AppConfig>,
    detector: FaceDetector,
    store: AssetStore,
}

impl EffectService {
    /// Validate `config`, load the classifier and open the upload directory.
    /// Call once at startup.
    #[instrument(skip_all, fields(upload_dir = %config.upload_dir.display()))]
    pub fn init(config: AppConfig) -> Result<Self, StartupError> {
        config.validate()?;
        let model = ClassifierModel::load(&config.classifier_path)?;
        let detector = FaceDetector::new(Arc::new(model), config.detector.clone());
        let service = Self::with_detector(config, detector)?;
        info!("Effect service initialised");
        Ok(service)
    }

    /// Build a service around an existing detector. Used by embedders that
    /// manage the model themselves, and by tests.
    pub fn with_detector(config: AppConfig, detector: FaceDetector) -> Result<Self, StartupError> {
        config.validate()?;
        let store = AssetStore::open(&config.upload_dir)?;
        Ok(Self {
            config: Arc::new(config),
            detector,
            store,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn detector(&self) -> &FaceDetector {
        &self.detector
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Validate, transform and persist one upload.
    ///
    /// Both assets are staged only after the effect has been applied and
    /// encoded, and published only once both are fully written. A failed
    /// request never removes or truncates assets from earlier requests.
    #[instrument(
        skip_all,
        fields(filename = %request.filename, effect = %request.effect, len = request.bytes.len())
    )]
    pub fn process_upload(&self, request: UploadRequest) -> Result<ProcessedUpload, CoreError> {
        let result = self.process(request);
        if let Err(ref err) = result {
            warn!(error = %err, class = ?err.class(), "Upload rejected");
        }
        result
    }

    /// Run `process_upload` on tokio's blocking pool.
    pub async fn process_upload_blocking(
        &self,
        request: UploadRequest,
    ) -> Result<ProcessedUpload, CoreError> {
        let service = self.clone();
        match tokio::task::spawn_blocking(move || service.process_upload(request)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(CoreError::InvalidState(format!(
                "upload worker cancelled: {err}"
            ))),
        }
    }

    fn process(&self, request: UploadRequest) -> Result<ProcessedUpload, CoreError> {
        let upload = accept(request.bytes, &request.filename, self.config.max_upload_bytes)?;
        let effect: Effect = request.effect.parse()?;

        let output = EffectPipeline::new(effect, &self.detector, &self.config).run(
            &upload.bytes,
            &upload.extension,
            upload.format,
        )?;

        let original = self.store.stage(&upload.sanitized, &upload.bytes)?;
        let processed = self.store.stage(&upload.sanitized.processed(), &output.bytes)?;

        // The processed asset goes first: if either rename fails the
        // original name still holds whatever it held before this request.
        let processed = processed.commit()?;
        let original = match original.commit() {
            Ok(asset) => asset,
            Err(err) => {
                self.store.remove(&processed.id);
                return Err(err.into());
            }
        };

        info!(
            original = %original.id,
            processed = %processed.id,
            faces = output.faces.len(),
            "Upload processed"
        );
        Ok(ProcessedUpload {
            effect,
            original,
            processed,
            faces: output.faces,
        })
    }
}
