//! Tolerance constants for pitch testing.
//!
//! Different checks require different precision levels.

/// Floating point rounding errors (exact conversions).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Semitone-quantized frequencies are compared to this many Hz.
pub const SEMITONE_HZ_EPSILON: f32 = 0.01;

/// Relative error accepted from a pitch estimator on a clean tone (2%).
pub const PITCH_RATIO_TOLERANCE: f32 = 0.02;

/// Whether `measured` is within [`PITCH_RATIO_TOLERANCE`] of `expected`.
pub fn pitch_close(measured: f32, expected: f32) -> bool {
    ((measured - expected) / expected).abs() < PITCH_RATIO_TOLERANCE
}
