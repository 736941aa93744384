//! Pitch estimators.
//!
//! An estimator turns one analysis window of pre-filtered samples into a
//! fundamental frequency and a confidence score. It knows nothing about
//! volume gating or smoothing; [`PitchDetector`](crate::PitchDetector)
//! applies those around it.

mod mcleod;
mod yin;

pub use mcleod::McLeodEstimator;
pub use yin::YinEstimator;

use pitchhop_core::DetectionAlgorithm;

/// Output of a single estimation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Estimate {
    /// Estimated fundamental in Hz (0.0 if no pitch was found)
    pub frequency_hz: f32,
    /// Periodicity of the window (0.0 - 1.0)
    pub confidence: f32,
}

impl Estimate {
    pub const UNVOICED: Estimate = Estimate {
        frequency_hz: 0.0,
        confidence: 0.0,
    };

    pub fn is_voiced(&self) -> bool {
        self.frequency_hz > 0.0 && self.confidence > 0.0
    }
}

/// A monophonic fundamental-frequency estimator.
///
/// Implementations keep their scratch buffers between calls and must not
/// allocate in [`estimate`](Self::estimate) once warmed up.
pub trait PitchEstimator: Send {
    /// Estimate the fundamental of `samples`.
    ///
    /// Windows shorter than [`required_samples`](Self::required_samples)
    /// are analyzed over whatever lag range fits, which may be unvoiced.
    fn estimate(&mut self, samples: &[f32]) -> Estimate;

    /// Window length needed to see two periods of the lowest frequency.
    fn required_samples(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Samples needed to cover two periods of `min_frequency_hz`.
pub fn required_block_size(sample_rate: u32, min_frequency_hz: f32) -> usize {
    if !(min_frequency_hz > 0.0) {
        return 0;
    }
    let period = (sample_rate as f32 / min_frequency_hz).ceil() as usize;
    period * 2
}

/// Build the estimator for `algorithm`.
pub fn create_estimator(
    algorithm: DetectionAlgorithm,
    sample_rate: u32,
    min_frequency_hz: f32,
    max_frequency_hz: f32,
) -> Box<dyn PitchEstimator> {
    match algorithm {
        DetectionAlgorithm::Yin => Box::new(YinEstimator::new(
            sample_rate,
            min_frequency_hz,
            max_frequency_hz,
        )),
        DetectionAlgorithm::McLeod => Box::new(McLeodEstimator::new(
            sample_rate,
            min_frequency_hz,
            max_frequency_hz,
        )),
    }
}

/// Vertex of the parabola through `(x-1, a)`, `(x, b)`, `(x+1, c)`.
///
/// Returns `(offset, value)` with `offset` in `[-1, 1]` relative to `x`.
pub(crate) fn parabolic_vertex(a: f32, b: f32, c: f32) -> (f32, f32) {
    let denominator = a - 2.0 * b + c;
    if denominator.abs() < 1e-12 {
        return (0.0, b);
    }
    let offset = (0.5 * (a - c) / denominator).clamp(-1.0, 1.0);
    let value = b - 0.25 * (a - c) * offset;
    (offset, value)
}
