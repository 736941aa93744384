//! # pitchhop-control
//!
//! Turns validated pitch into game control:
//!
//! - [`StabilityGate`]: debounces per-block levels into [`JumpTrigger`](pitchhop_core::JumpTrigger)s
//! - [`calibration`]: learns the user's base pitch from a short guided recording
//!
//! ## Example
//!
//! ```rust
//! use pitchhop_control::StabilityGate;
//! use pitchhop_core::StabilityPreset;
//! use std::time::Instant;
//!
//! let mut gate = StabilityGate::new(&StabilityPreset::Responsive.stability());
//! let now = Instant::now();
//!
//! assert!(gate.process(Some(4), now).is_none());
//! let trigger = gate.process(Some(4), now).unwrap();
//! assert_eq!(trigger.level, 4);
//! ```

pub mod calibration;
pub mod error;
mod gate;

pub use calibration::{
    CalibrationConfig, CalibrationEngine, CalibrationEvent, CalibrationState, CalibrationWorker,
    PitchFeed,
};
pub use error::{CalibrationError, Result};
pub use gate::StabilityGate;
