// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgfx-service: Ties validation, decoding, the five effects, and storage
// into a single request operation for the request-handling layer.

pub mod pipeline;
pub mod service;

pub use pipeline::{DispatchState, EffectOutput, EffectPipeline};
pub use service::{EffectService, StartupError};
