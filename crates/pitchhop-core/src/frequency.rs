//! Frequency ↔ semitone conversion.
//!
//! All conversions are relative to a reference pitch (A4 = 440 Hz unless
//! stated otherwise). A semitone is a frequency ratio of 2^(1/12).
//!
//! Logarithms are undefined for non-positive frequencies. The raw conversion
//! [`semitones_from_reference`] expects `freq_hz > 0`; display helpers such as
//! [`note_name`] return a sentinel instead.

/// Fixed reference pitch (A4) used for level mapping, calibration bins and note names.
pub const REFERENCE_PITCH_HZ: f32 = 440.0;

/// MIDI note number of the reference pitch.
const REFERENCE_MIDI: i32 = 69;

/// Displayed when a frequency has no meaningful note.
const UNKNOWN_NOTE: &str = "--";

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Semitone distance `12 * log2(freq_hz / reference_hz)`.
///
/// Callers must check `freq_hz > 0` and `reference_hz > 0` first.
#[inline]
pub fn semitones_from_reference(freq_hz: f32, reference_hz: f32) -> f32 {
    debug_assert!(freq_hz > 0.0 && reference_hz > 0.0);
    12.0 * (freq_hz / reference_hz).log2()
}

/// Exact inverse of [`semitones_from_reference`].
#[inline]
pub fn frequency_from_semitones(semitones: f32, reference_hz: f32) -> f32 {
    reference_hz * 2.0f32.powf(semitones / 12.0)
}

/// Snap a frequency to the nearest equal-tempered semitone relative to 440 Hz.
///
/// Returns 0.0 for non-positive input.
pub fn quantize_to_semitone(freq_hz: f32) -> f32 {
    if freq_hz <= 0.0 {
        return 0.0;
    }
    let semitone = semitones_from_reference(freq_hz, REFERENCE_PITCH_HZ).round();
    frequency_from_semitones(semitone, REFERENCE_PITCH_HZ)
}

/// Nearest note of a frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteInfo {
    /// Note name with sharp notation (e.g., "A4", "C#5")
    pub name: String,
    /// MIDI note number (may fall outside 0-127 for extreme inputs)
    pub midi: i32,
    /// Cents deviation from the nearest note (-50 to +50)
    pub cents: f32,
}

/// Nearest equal-tempered note, or `None` for non-positive frequencies.
pub fn note_info(freq_hz: f32) -> Option<NoteInfo> {
    if freq_hz <= 0.0 || !freq_hz.is_finite() {
        return None;
    }

    let exact = semitones_from_reference(freq_hz, REFERENCE_PITCH_HZ);
    let offset = exact.round();
    let midi = REFERENCE_MIDI + offset as i32;
    let cents = (exact - offset) * 100.0;

    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;

    Some(NoteInfo {
        name: format!("{}{}", name, octave),
        midi,
        cents,
    })
}

/// Note name for display ("A4", "C#3"), or `"--"` if the frequency is not positive.
pub fn note_name(freq_hz: f32) -> String {
    note_info(freq_hz)
        .map(|info| info.name)
        .unwrap_or_else(|| UNKNOWN_NOTE.to_string())
}
