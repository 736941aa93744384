//! # PitchHop - Voice-Controlled Jumping
//!
//! Turns a live mono audio stream into debounced "jump intensity" triggers
//! for a game, and learns the player's base pitch with a guided calibration.
//!
//! ## Architecture
//!
//! PitchHop is an umbrella crate that coordinates:
//! - **pitchhop-core** - Frequency math, level mapping, settings snapshots, listener fan-out
//! - **pitchhop-analysis** - PCM decoding, smoothing, YIN/McLeod estimators, pitch detector
//! - **pitchhop-control** - Stability gate and base-pitch calibration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pitchhop::prelude::*;
//!
//! let engine = PitchHopEngine::builder().build()?;
//!
//! engine.subscribe_triggers(|trigger: &JumpTrigger| {
//!     println!("jump with intensity {}", trigger.level);
//!     Ok::<(), ListenerError>(())
//! });
//!
//! // Learn the player's base pitch first
//! engine.start_calibration()?;
//!
//! // Then feed 16-bit PCM blocks from the capture device
//! let block = AudioBlock::new(vec![0u8; engine.block_size() * 2], -60.0);
//! engine.push_block(block)?;
//! # Ok::<(), pitchhop::Error>(())
//! ```

/// Re-export of pitchhop-core for direct access
pub use pitchhop_core as core;

pub use pitchhop_analysis as analysis;
pub use pitchhop_control as control;

// Core types
pub use pitchhop_core::{
    frequency_for_level, jump_level, note_name, ControlLevel, Delivery, DetectionAlgorithm,
    JumpTrigger, Listener, ListenerError, ListenerId, PitchEvent, Settings, SettingsStore,
    StabilityPreset, StabilitySettings, MAX_LEVEL,
};

// Analysis
pub use pitchhop_analysis::{AudioBlock, Detection, PitchDetector, PitchEstimator};

// Control
pub use pitchhop_control::{
    CalibrationConfig, CalibrationEvent, CalibrationState, StabilityGate,
};

mod builder;
mod engine;
mod error;
mod live;
mod pipeline;

pub use builder::PitchHopEngineBuilder;
pub use engine::PitchHopEngine;
pub use error::{Error, Result};
pub use live::PipelineState;
pub use pipeline::{BlockOutcome, JumpPipeline, PipelineListeners};

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{PitchHopEngine, PitchHopEngineBuilder};

    // Audio in, events out
    pub use crate::{AudioBlock, JumpTrigger, PitchEvent};

    // Listeners
    pub use crate::{Delivery, ListenerError, ListenerId};

    // Settings
    pub use crate::{Settings, StabilityPreset};

    // Calibration
    pub use crate::{CalibrationEvent, CalibrationState};
}
