//! Test helpers and fixtures for pitchhop integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact conversions
//! - `SEMITONE_HZ_EPSILON` (0.01 Hz): Quantized base pitches
//! - `PITCH_RATIO_TOLERANCE` (2%): Estimator output on clean tones

#![allow(dead_code)]

pub mod tolerances;

use pitchhop::prelude::*;
use pitchhop::CalibrationConfig;
use std::time::{Duration, Instant};

/// Default test sample rate (matches the default settings)
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Calibration timings short enough for tests.
pub fn fast_calibration() -> CalibrationConfig {
    CalibrationConfig {
        countdown_ticks: 2,
        tick_interval: Duration::from_millis(20),
        recording_duration: Duration::from_millis(400),
        analysis_delay: Duration::from_millis(10),
        min_samples: 10,
        poll_interval: Duration::from_millis(5),
    }
}

/// Build an engine with fast calibration and the given stability preset.
pub fn test_engine(preset: StabilityPreset) -> PitchHopEngine {
    init_tracing();
    PitchHopEngine::builder()
        .preset(preset)
        .calibration(fast_calibration())
        .build()
        .expect("Failed to create test engine")
}

/// Phase-continuous sine source producing PCM blocks.
pub struct SineSource {
    frequency: f32,
    amplitude: f32,
    phase: f64,
}

impl SineSource {
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
            phase: 0.0,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn next_block(&mut self, len: usize) -> AudioBlock {
        let step = 2.0 * std::f64::consts::PI * self.frequency as f64 / TEST_SAMPLE_RATE as f64;
        let samples: Vec<f32> = (0..len)
            .map(|_| {
                let sample = self.phase.sin() as f32 * self.amplitude;
                self.phase = (self.phase + step) % (2.0 * std::f64::consts::PI);
                sample
            })
            .collect();
        AudioBlock::from_samples(&samples)
    }
}

/// Generate silence as a PCM block.
pub fn silent_block(len: usize) -> AudioBlock {
    AudioBlock::from_samples(&vec![0.0; len])
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Push blocks from `source` every few milliseconds while `keep_going` holds.
pub fn stream_while(
    engine: &PitchHopEngine,
    source: &mut SineSource,
    timeout: Duration,
    mut keep_going: impl FnMut() -> bool,
) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline && keep_going() {
        let _ = engine.push_block(source.next_block(engine.block_size()));
        std::thread::sleep(Duration::from_millis(5));
    }
}
