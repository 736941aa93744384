//! Pitch → jump level mapping.
//!
//! A level is the number of semitones the sung pitch sits above the user's
//! calibrated base pitch, clamped to `[0, MAX_LEVEL]`. Both the sung pitch and
//! the base pitch are measured against the same fixed reference
//! ([`REFERENCE_PITCH_HZ`]) and the two offsets are subtracted before rounding.

use crate::frequency::{frequency_from_semitones, semitones_from_reference, REFERENCE_PITCH_HZ};

/// Discrete jump intensity. Zero means "no actionable pitch".
pub type ControlLevel = u8;

/// Highest level a pitch can map to.
pub const MAX_LEVEL: ControlLevel = 35;

/// Semitone offset of the calibrated base pitch from the reference.
#[inline]
fn calibration_offset(base_hz: f32) -> f32 {
    semitones_from_reference(base_hz, REFERENCE_PITCH_HZ)
}

/// Map a pitch to a jump level relative to `base_hz`.
///
/// Returns 0 for non-positive or non-finite `current_hz` or `base_hz`.
pub fn jump_level(current_hz: f32, base_hz: f32) -> ControlLevel {
    if !(current_hz > 0.0) || !current_hz.is_finite() || !(base_hz > 0.0) || !base_hz.is_finite() {
        return 0;
    }

    let offset = semitones_from_reference(current_hz, REFERENCE_PITCH_HZ) - calibration_offset(base_hz);
    offset.round().clamp(0.0, MAX_LEVEL as f32) as ControlLevel
}

/// Frequency in Hz that maps exactly onto `level` for the given base pitch.
///
/// Inverse of [`jump_level`] over `[0, MAX_LEVEL]`. Returns 0.0 for a
/// non-positive or non-finite `base_hz`, matching [`jump_level`].
pub fn frequency_for_level(level: ControlLevel, base_hz: f32) -> f32 {
    if !(base_hz > 0.0) || !base_hz.is_finite() {
        return 0.0;
    }
    let level = level.min(MAX_LEVEL);
    frequency_from_semitones(level as f32 + calibration_offset(base_hz), REFERENCE_PITCH_HZ)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_base_pitch_is_level_zero() {
        assert_eq!(jump_level(146.83, 146.83), 0);
        assert_eq!(jump_level(220.0, 220.0), 0);
    }

    #[test]
    fn test_invalid_base_pitch() {
        assert_eq!(jump_level(220.0, 0.0), 0);
        assert_eq!(frequency_for_level(5, 0.0), 0.0);
        assert_eq!(frequency_for_level(5, -110.0), 0.0);
        assert_eq!(frequency_for_level(5, f32::NAN), 0.0);
    }

    #[test]
    fn test_octave_above_base() {
        assert_eq!(jump_level(293.66, 146.83), 12);
        assert_eq!(jump_level(440.0, 220.0), 12);
    }

    #[test]
    fn test_below_base_clamps_to_zero() {
        assert_eq!(jump_level(100.0, 200.0), 0);
    }

    #[test]
    fn test_clamped_to_max_level() {
        assert_eq!(jump_level(10_000.0, 100.0), MAX_LEVEL);
    }

    #[test]
    fn test_non_positive_input() {
        assert_eq!(jump_level(0.0, 150.0), 0);
        assert_eq!(jump_level(-10.0, 150.0), 0);
        assert_eq!(jump_level(f32::NAN, 150.0), 0);
        assert_eq!(jump_level(300.0, 0.0), 0);
    }

    #[test]
    fn test_frequency_for_level() {
        assert_relative_eq!(frequency_for_level(0, 146.83), 146.83, epsilon = 0.01);
        assert_relative_eq!(frequency_for_level(12, 146.83), 293.66, epsilon = 0.02);
        // Out-of-range levels saturate at MAX_LEVEL
        assert_relative_eq!(
            frequency_for_level(200, 100.0),
            frequency_for_level(MAX_LEVEL, 100.0),
            epsilon = 1e-3
        );
    }

    proptest! {
        #[test]
        fn prop_non_positive_is_zero(f in -5000.0f32..=0.0, base in 20.0f32..2000.0) {
            prop_assert_eq!(jump_level(f, base), 0);
        }

        #[test]
        fn prop_level_in_range(f in 1.0f32..20_000.0, base in 20.0f32..2000.0) {
            prop_assert!(jump_level(f, base) <= MAX_LEVEL);
        }

        #[test]
        fn prop_monotonic(a in 1.0f32..5000.0, b in 1.0f32..5000.0, base in 20.0f32..2000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(jump_level(lo, base) <= jump_level(hi, base));
        }

        #[test]
        fn prop_inverse_lands_on_same_semitone(offset in 0.0f32..35.4, base in 60.0f32..500.0) {
            // Stay clear of the rounding boundary between two semitones
            prop_assume!((offset.fract() - 0.5).abs() > 1e-2);

            let f = base * 2.0f32.powf(offset / 12.0);
            let level = jump_level(f, base);
            prop_assert_eq!(level as f32, offset.round());

            let back = frequency_for_level(level, base);
            let back_semitones = 12.0 * (back / base).log2();
            prop_assert_eq!(back_semitones.round(), offset.round());
            prop_assert!((back_semitones - level as f32).abs() < 1e-2);
        }
    }
}
