// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the upload page.
//
// Every `CoreError` maps to a short plain-English message, a suggestion, and
// the HTTP status the request-handling layer should answer with.

use crate::error::{CoreError, ErrorClass};

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try next.
    pub suggestion: String,
    /// HTTP status code for the response.
    pub status: u16,
    pub class: ErrorClass,
}

/// Convert a `CoreError` into a `HumanError` suitable for display.
pub fn humanize_error(err: &CoreError) -> HumanError {
    let class = err.class();
    match err {
        CoreError::NoFile => HumanError {
            message: "No file was selected.".into(),
            suggestion: "Choose a PNG or JPEG image, then upload again.".into(),
            status: 400,
            class,
        },

        CoreError::UnsupportedType(ext) => HumanError {
            message: "This file type isn't supported.".into(),
            suggestion: format!("Upload a PNG or JPEG image instead. (File type: {ext})"),
            status: 400,
            class,
        },

        CoreError::TooLarge { size, limit } => HumanError {
            message: "This image is too large.".into(),
            suggestion: format!(
                "Images can be at most {} KiB; this one is {} KiB. \
                 Try a smaller or compressed copy.",
                limit / 1024,
                size.div_ceil(1024)
            ),
            status: 413,
            class,
        },

        CoreError::UnknownEffect(name) => HumanError {
            message: "That effect isn't available.".into(),
            suggestion: format!(
                "Pick one of grayscale, blur, rotate, mirror or face_detect. (Requested: {name})"
            ),
            status: 400,
            class,
        },

        CoreError::CorruptData(_) => HumanError {
            message: "We couldn't read this image.".into(),
            suggestion: "The file may be damaged or saved with the wrong extension. \
                         Re-export it and try again."
                .into(),
            status: 422,
            class,
        },

        CoreError::ModelNotLoaded => HumanError {
            message: "Face detection is unavailable right now.".into(),
            suggestion: "Try another effect. The face detection model could not be loaded.".into(),
            status: 503,
            class,
        },

        CoreError::EncodeFailure(_) | CoreError::StorageFailure(_) | CoreError::InvalidState(_) => {
            HumanError {
                message: "Something went wrong while processing the image.".into(),
                suggestion: format!("Please try again later. ({err})"),
                status: 500,
                class,
            }
        }
    }
}
