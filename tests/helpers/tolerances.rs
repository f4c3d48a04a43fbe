//! Tolerance constants for audio round-trip tests.
//!
//! Engine samples are `f64`. A plugin running on 32-bit buffers narrows
//! every sample once on the way in, so its output only matches to single
//! precision.

/// Narrowing to `f32` and back for samples in -1..1.
pub const FLOAT32_EPSILON: f64 = 1e-6;

/// 64-bit buffers are copied word for word.
pub const EXACT: f64 = 0.0;
