// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error taxonomy for imgfx.
//
// Each stage has its own narrow error enum; `CoreError` is the flattened set
// of kinds surfaced to the request-handling layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ImageFormat;

/// Invalid pixel-grid construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("sample buffer holds {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("grid dimensions {width}x{height} overflow the address space")]
    DimensionsOverflow { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(String),

    #[error("corrupt image data: {0}")]
    CorruptData(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{format} encoding failed: {detail}")]
    Failed { format: ImageFormat, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("face classifier model is not loaded")]
    ModelNotLoaded,

    #[error("image has zero width or height")]
    EmptyImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown effect: {0:?}")]
    UnknownEffect(String),

    #[error("pipeline step requires state {expected}, but pipeline is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no file selected")]
    NoFile,

    #[error("unsupported file type: {0:?}")]
    UnsupportedType(String),

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create upload directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
}

/// Failure loading or validating the application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How a failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Bad input from the client. Report, never retry.
    Validation,
    /// Input or environment made processing fail. Report, never retry.
    Processing,
    /// The service cannot serve any request.
    Fatal,
}

/// Error kinds surfaced to the request-handling layer.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported file type: {0:?}")]
    UnsupportedType(String),

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("no file selected")]
    NoFile,

    #[error("unknown effect: {0:?}")]
    UnknownEffect(String),

    #[error("corrupt image data: {0}")]
    CorruptData(String),

    #[error("face classifier model is not loaded")]
    ModelNotLoaded,

    #[error("image encoding failed: {0}")]
    EncodeFailure(String),

    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    #[error("effect pipeline misuse: {0}")]
    InvalidState(String),
}

impl CoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedType(_)
            | Self::TooLarge { .. }
            | Self::NoFile
            | Self::UnknownEffect(_) => ErrorClass::Validation,
            Self::CorruptData(_)
            | Self::EncodeFailure(_)
            | Self::StorageFailure(_)
            | Self::InvalidState(_) => ErrorClass::Processing,
            Self::ModelNotLoaded => ErrorClass::Fatal,
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::NoFile => Self::NoFile,
            ValidationError::UnsupportedType(ext) => Self::UnsupportedType(ext),
            ValidationError::TooLarge { size, limit } => Self::TooLarge { size, limit },
        }
    }
}

impl From<DecodeError> for CoreError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnsupportedFormat(ext) => Self::UnsupportedType(ext),
            DecodeError::CorruptData(detail) => Self::CorruptData(detail),
        }
    }
}

impl From<EncodeError> for CoreError {
    fn from(err: EncodeError) -> Self {
        Self::EncodeFailure(err.to_string())
    }
}

impl From<DetectionError> for CoreError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::ModelNotLoaded => Self::ModelNotLoaded,
            DetectionError::EmptyImage => Self::CorruptData(err.to_string()),
        }
    }
}

impl From<DispatchError> for CoreError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownEffect(name) => Self::UnknownEffect(name),
            DispatchError::InvalidState { .. } => Self::InvalidState(err.to_string()),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_their_kind() {
        assert!(matches!(CoreError::from(ValidationError::NoFile), CoreError::NoFile));
        assert!(matches!(
            CoreError::from(ValidationError::TooLarge { size: 10, limit: 5 }),
            CoreError::TooLarge { size: 10, limit: 5 }
        ));
    }

    #[test]
    fn decode_errors_map_to_core_kinds() {
        let err = CoreError::from(DecodeError::UnsupportedFormat("gif".into()));
        assert!(matches!(err, CoreError::UnsupportedType(ext) if ext == "gif"));

        let err = CoreError::from(DecodeError::CorruptData("bad header".into()));
        assert_eq!(err.class(), ErrorClass::Processing);
    }

    #[test]
    fn missing_model_is_fatal() {
        let err = CoreError::from(DetectionError::ModelNotLoaded);
        assert!(matches!(err, CoreError::ModelNotLoaded));
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn unknown_effect_is_a_validation_error() {
        let err = CoreError::from(DispatchError::UnknownEffect("sepia".into()));
        assert_eq!(err.class(), ErrorClass::Validation);
    }
}
