// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgfx: Core types, error taxonomy, and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use crate::config::{AnnotationSettings, AppConfig, DetectorSettings};
pub use crate::error::{CoreError, ErrorClass};
pub use crate::types::*;
