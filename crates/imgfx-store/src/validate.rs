// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload validation and filename sanitising.

use imgfx_core::error::ValidationError;
use imgfx_core::{AssetId, ImageFormat};
use tracing::{debug, instrument, warn};

/// Extensions accepted for upload (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

const WINDOWS_DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// An upload that passed every check, ready to be decoded and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpload {
    pub bytes: Vec<u8>,
    /// Filename as supplied by the client.
    pub original_filename: String,
    /// Storage identifier derived from the sanitised filename.
    pub sanitized: AssetId,
    pub format: ImageFormat,
    /// Lowercased extension of the sanitised name (`png`, `jpg` or `jpeg`).
    pub extension: String,
}

/// Validate an upload.
///
/// Checks run in a fixed order: a missing filename is `NoFile`, a name
/// without an allowed extension (before or after sanitising) is
/// `UnsupportedType`, and a body over `size_limit` bytes is `TooLarge`.
#[instrument(skip(raw_bytes), fields(len = raw_bytes.len()))]
pub fn accept(
    raw_bytes: Vec<u8>,
    filename: &str,
    size_limit: u64,
) -> Result<ValidatedUpload, ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError::NoFile);
    }

    allowed_extension(filename)
        .ok_or_else(|| ValidationError::UnsupportedType(extension_of(filename).to_owned()))?;

    let sanitized = sanitize_filename(filename);
    let Some(extension) = allowed_extension(&sanitized) else {
        warn!(filename, %sanitized, "Sanitised filename lost its extension");
        return Err(ValidationError::UnsupportedType(
            extension_of(&sanitized).to_owned(),
        ));
    };
    let format = ImageFormat::from_extension(&extension)
        .ok_or_else(|| ValidationError::UnsupportedType(extension.clone()))?;

    let size = raw_bytes.len() as u64;
    if size > size_limit {
        return Err(ValidationError::TooLarge {
            size,
            limit: size_limit,
        });
    }

    debug!(%sanitized, %format, "Upload accepted");
    Ok(ValidatedUpload {
        bytes: raw_bytes,
        original_filename: filename.to_owned(),
        sanitized: AssetId(sanitized),
        format,
        extension,
    })
}

/// Reduce a client-supplied filename to a flat, portable name.
///
/// Path separators become spaces, non-ASCII characters are dropped,
/// whitespace runs collapse to `_`, anything outside `[A-Za-z0-9_.-]` is
/// removed and leading/trailing `.` and `_` are trimmed. Windows device
/// names gain a `_` prefix. The result may be empty.
pub fn sanitize_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let stripped: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = stripped.trim_matches(|c| c == '.' || c == '_');

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES.contains(&stem.to_ascii_uppercase().as_str()) {
        format!("_{trimmed}")
    } else {
        trimmed.to_owned()
    }
}

fn extension_of(filename: &str) -> &str {
    filename.rsplit_once('.').map_or("", |(_, ext)| ext)
}

fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}
