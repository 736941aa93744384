//! # pitchhop-analysis
//!
//! Turns blocks of mono PCM audio into validated, smoothed pitch readings.
//!
//! - **PCM**: 16-bit little-endian decoding and block level metering
//! - **Smoothing**: one-pole pre-filter on samples, rolling average on estimates
//! - **Estimators**: YIN and McLeod (NSDF) behind the [`PitchEstimator`] trait
//! - **Detector**: [`PitchDetector`] ties the above together and applies
//!   volume and range gating
//!
//! ## Example
//!
//! ```rust
//! use pitchhop_analysis::{AudioBlock, PitchDetector};
//! use pitchhop_core::Settings;
//! use std::time::Instant;
//!
//! let settings = Settings::default();
//! let mut detector = PitchDetector::new(&settings);
//!
//! let samples: Vec<f32> = (0..detector.block_size())
//!     .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 44100.0).sin() * 0.5)
//!     .collect();
//! let block = AudioBlock::from_samples(&samples);
//!
//! let detection = detector.process(&block, &settings, Instant::now());
//! assert!(detection.pitch.is_valid);
//! ```

pub mod estimator;
pub mod pcm;
pub mod smoother;

mod detector;

pub use detector::{Detection, PitchDetector, PitchSample, ValidatedPitch};
pub use estimator::{
    create_estimator, required_block_size, Estimate, McLeodEstimator, PitchEstimator, YinEstimator,
};
pub use pcm::{decode_pcm16, encode_pcm16, level_db, AudioBlock, SILENCE_DB};
pub use smoother::{PitchSmoother, PreFilter, RollingAverage};
