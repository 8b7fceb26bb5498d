// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgfx-store: Checks uploads before any decoding happens and persists the
// original and processed buffers in the upload directory.
//
// Every write lands in a temporary file beside its target and is renamed
// into place, so readers only ever see complete assets. Each stored asset
// carries the SHA-256 of its bytes, checked again on read.

pub mod storage;
pub mod validate;

pub use storage::{AssetStore, StagedAsset};
pub use validate::{ALLOWED_EXTENSIONS, ValidatedUpload, accept, sanitize_filename};
