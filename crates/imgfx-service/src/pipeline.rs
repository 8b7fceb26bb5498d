// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Effect dispatcher.
//
// A pipeline moves through Idle -> Decoded -> Transformed -> Encoded. Any
// failing step leaves it in Failed, and calling a step from the wrong state
// is an `InvalidState` error. Nothing here touches the filesystem; the
// service persists the encoded output only after `finish` succeeds.

use imgfx_core::error::DispatchError;
use imgfx_core::{AppConfig, CoreError, Effect, EffectResult, FaceBox, ImageFormat};
use imgfx_detect::{FaceDetector, annotate};
use imgfx_imaging::ImageProcessor;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Decoded,
    Transformed,
    Encoded,
    Failed,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Decoded => "decoded",
            Self::Transformed => "transformed",
            Self::Encoded => "encoded",
            Self::Failed => "failed",
        }
    }
}

/// Encoded output of a completed pipeline.
#[derive(Debug, Clone)]
pub struct EffectOutput {
    pub effect: Effect,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
    pub faces: Vec<FaceBox>,
}

#[derive(Debug)]
enum Stage {
    Empty,
    Decoded(ImageProcessor),
    Transformed(EffectResult),
    Encoded(EffectOutput),
}

/// Single-use dispatcher for one upload and one effect.
pub struct EffectPipeline<'a> {
    effect: Effect,
    detector: &'a FaceDetector,
    config: &'a AppConfig,
    state: DispatchState,
    stage: Stage,
}

impl<'a> EffectPipeline<'a> {
    pub fn new(effect: Effect, detector: &'a FaceDetector, config: &'a AppConfig) -> Self {
        Self {
            effect,
            detector,
            config,
            state: DispatchState::Idle,
            stage: Stage::Empty,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Decode, transform and encode in one go.
    pub fn run(
        mut self,
        bytes: &[u8],
        extension: &str,
        format: ImageFormat,
    ) -> Result<EffectOutput, CoreError> {
        self.decode(bytes, extension)?;
        self.transform()?;
        self.encode(format)?;
        self.finish()
    }

    /// Idle -> Decoded.
    #[instrument(skip(self, bytes), fields(effect = %self.effect, len = bytes.len()))]
    pub fn decode(&mut self, bytes: &[u8], extension: &str) -> Result<(), CoreError> {
        self.expect_state(DispatchState::Idle)?;
        let decoded = ImageProcessor::from_bytes(bytes, extension).map_err(CoreError::from);
        let processor = self.settle(decoded)?;
        self.advance(DispatchState::Decoded, Stage::Decoded(processor));
        Ok(())
    }

    /// Decoded -> Transformed: run exactly one effect.
    #[instrument(skip(self), fields(effect = %self.effect))]
    pub fn transform(&mut self) -> Result<(), CoreError> {
        self.expect_state(DispatchState::Decoded)?;
        let Stage::Decoded(processor) = std::mem::replace(&mut self.stage, Stage::Empty) else {
            return Err(self.fail(invalid(DispatchState::Decoded, self.state)));
        };

        let result = apply(self.effect, processor, self.detector, self.config);
        let result = self.settle(result)?;
        debug!(
            width = result.grid.width(),
            height = result.grid.height(),
            faces = result.faces.len(),
            "Effect applied"
        );
        self.advance(DispatchState::Transformed, Stage::Transformed(result));
        Ok(())
    }

    /// Transformed -> Encoded.
    #[instrument(skip(self), fields(effect = %self.effect))]
    pub fn encode(&mut self, format: ImageFormat) -> Result<(), CoreError> {
        self.expect_state(DispatchState::Transformed)?;
        let Stage::Transformed(result) = std::mem::replace(&mut self.stage, Stage::Empty) else {
            return Err(self.fail(invalid(DispatchState::Transformed, self.state)));
        };

        let encoded = ImageProcessor::from_grid(result.grid)
            .to_bytes(format, self.config.jpeg_quality)
            .map_err(CoreError::from);
        let bytes = self.settle(encoded)?;
        self.advance(
            DispatchState::Encoded,
            Stage::Encoded(EffectOutput {
                effect: result.effect,
                format,
                bytes,
                faces: result.faces,
            }),
        );
        Ok(())
    }

    /// Take the encoded output. Only valid once `encode` has succeeded.
    pub fn finish(mut self) -> Result<EffectOutput, CoreError> {
        self.expect_state(DispatchState::Encoded)?;
        match std::mem::replace(&mut self.stage, Stage::Empty) {
            Stage::Encoded(output) => Ok(output),
            _ => Err(invalid(DispatchState::Encoded, self.state).into()),
        }
    }

    fn expect_state(&self, expected: DispatchState) -> Result<(), CoreError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(invalid(expected, self.state).into())
        }
    }

    fn advance(&mut self, state: DispatchState, stage: Stage) {
        debug!(from = self.state.as_str(), to = state.as_str(), "Pipeline advanced");
        self.state = state;
        self.stage = stage;
    }

    /// Record a failed step so that every later step is rejected.
    fn settle<T>(&mut self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        result.map_err(|err| self.fail(err))
    }

    fn fail(&mut self, err: impl Into<CoreError>) -> CoreError {
        let err = err.into();
        warn!(from = self.state.as_str(), error = %err, "Pipeline failed");
        self.state = DispatchState::Failed;
        self.stage = Stage::Empty;
        err
    }
}

fn invalid(expected: DispatchState, actual: DispatchState) -> DispatchError {
    DispatchError::InvalidState {
        expected: expected.as_str(),
        actual: actual.as_str(),
    }
}

fn apply(
    effect: Effect,
    processor: ImageProcessor,
    detector: &FaceDetector,
    config: &AppConfig,
) -> Result<EffectResult, CoreError> {
    let (grid, faces) = match effect {
        Effect::Grayscale => (processor.grayscale().into_grid(), Vec::new()),
        Effect::Blur => (processor.blur(config.blur_radius).into_grid(), Vec::new()),
        Effect::Rotate => (processor.rotate_right_90().into_grid(), Vec::new()),
        Effect::Mirror => (processor.mirror().into_grid(), Vec::new()),
        Effect::FaceDetect => {
            let grid = processor.into_grid();
            let faces = detector.detect(&grid)?;
            (annotate(&grid, &faces, &config.annotation), faces)
        }
    };
    Ok(EffectResult {
        grid,
        effect,
        faces,
    })
}
