//! Per-block pitch detection with volume and range gating.

use crate::estimator::{create_estimator, PitchEstimator};
use crate::pcm::{decode_pcm16, AudioBlock};
use crate::smoother::PitchSmoother;
use pitchhop_core::{DetectionAlgorithm, Settings};
use std::time::Instant;
use tracing::{debug, trace};

/// Raw reading for one processed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchSample {
    /// Unsmoothed estimate in Hz (0.0 if no pitch)
    pub frequency_hz: f32,
    pub audio_level_db: f32,
    pub timestamp: Instant,
}

/// Smoothed pitch with its validity flag.
///
/// `is_valid` is false whenever the block level is at or below the volume
/// threshold, or the raw estimate is non-positive or above the maximum
/// frequency. `smoothed_hz` is 0.0 for invalid blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValidatedPitch {
    pub smoothed_hz: f32,
    pub is_valid: bool,
}

/// Output of [`PitchDetector::process`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub sample: PitchSample,
    pub pitch: ValidatedPitch,
}

/// Estimator parameters the detector was built for.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EstimatorKey {
    algorithm: DetectionAlgorithm,
    sample_rate: u32,
    min_frequency_hz: f32,
    max_frequency_hz: f32,
}

impl EstimatorKey {
    fn of(settings: &Settings) -> Self {
        Self {
            algorithm: settings.algorithm,
            sample_rate: settings.sample_rate,
            min_frequency_hz: settings.min_frequency_hz,
            max_frequency_hz: settings.max_frequency_hz,
        }
    }
}

/// Decodes PCM blocks, pre-filters them, estimates pitch and validates it.
///
/// Owns its [`PitchSmoother`]; not shared between threads.
pub struct PitchDetector {
    estimator: Box<dyn PitchEstimator>,
    /// None when the estimator was supplied by the caller
    key: Option<EstimatorKey>,
    smoother: PitchSmoother,
    samples: Vec<f32>,
}

impl PitchDetector {
    /// Build a detector using the estimator selected in `settings`.
    pub fn new(settings: &Settings) -> Self {
        let estimator = create_estimator(
            settings.algorithm,
            settings.sample_rate,
            settings.min_frequency_hz,
            settings.max_frequency_hz,
        );
        let mut detector = Self::with_estimator(settings, estimator);
        detector.key = Some(EstimatorKey::of(settings));
        detector
    }

    /// Build a detector around a caller-supplied estimator.
    ///
    /// The estimator is kept across [`reconfigure`](Self::reconfigure) calls.
    pub fn with_estimator(settings: &Settings, estimator: Box<dyn PitchEstimator>) -> Self {
        let capacity = estimator.required_samples();
        Self {
            estimator,
            key: None,
            smoother: PitchSmoother::new(settings.pre_filter_alpha, settings.smoothing_window),
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Samples per block the estimator needs.
    pub fn block_size(&self) -> usize {
        self.estimator.required_samples()
    }

    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    /// Apply a new settings snapshot.
    ///
    /// Smoothing parameters are updated in place. The estimator is rebuilt
    /// only if the algorithm, sample rate or frequency range changed.
    pub fn reconfigure(&mut self, settings: &Settings) {
        self.smoother.pre.set_alpha(settings.pre_filter_alpha);
        self.smoother.post.set_capacity(settings.smoothing_window);

        if let Some(key) = self.key {
            let next = EstimatorKey::of(settings);
            if key != next {
                debug!(
                    "Rebuilding {:?} estimator ({} Hz, {}-{} Hz)",
                    next.algorithm, next.sample_rate, next.min_frequency_hz, next.max_frequency_hz
                );
                self.estimator = create_estimator(
                    next.algorithm,
                    next.sample_rate,
                    next.min_frequency_hz,
                    next.max_frequency_hz,
                );
                self.smoother.post.clear();
                self.key = Some(next);
            }
        }
    }

    /// Process one block.
    ///
    /// The pre-filter runs over every sample even when the block is too quiet
    /// to estimate, so its state stays continuous.
    pub fn process(&mut self, block: &AudioBlock, settings: &Settings, now: Instant) -> Detection {
        decode_pcm16(&block.bytes, &mut self.samples);
        self.smoother.pre.process(&mut self.samples);

        let loud = block.level_db > settings.volume_threshold_db;
        let raw_hz = if loud {
            let estimate = self.estimator.estimate(&self.samples);
            trace!(
                "{} estimate {:.2} Hz (confidence {:.2})",
                self.estimator.name(),
                estimate.frequency_hz,
                estimate.confidence
            );
            if estimate.confidence >= settings.min_confidence {
                estimate.frequency_hz
            } else {
                0.0
            }
        } else {
            0.0
        };

        let is_valid = loud && raw_hz > 0.0 && raw_hz <= settings.max_frequency_hz;
        let smoothed_hz = if is_valid {
            self.smoother.post.push(raw_hz)
        } else {
            0.0
        };

        Detection {
            sample: PitchSample {
                frequency_hz: raw_hz,
                audio_level_db: block.level_db,
                timestamp: now,
            },
            pitch: ValidatedPitch {
                smoothed_hz,
                is_valid,
            },
        }
    }
}
