//! Guided base-pitch calibration.
//!
//! - [`stats`]: outlier removal, semitone histogram and cluster selection
//! - [`CalibrationEngine`]: session state machine advanced by `tick(now)`
//! - [`CalibrationWorker`]: thread owning the engine, driven by commands

mod engine;
pub mod stats;
mod worker;

pub use engine::{
    Analyzer, CalibrationConfig, CalibrationEngine, CalibrationEvent, CalibrationSession,
    CalibrationState,
};
pub use stats::{estimate_base_pitch, BasePitchEstimate, CalibrationMode, Selection};
pub use worker::{
    CalibrationCommand, CalibrationShared, CalibrationTarget, CalibrationWorker, PitchFeed,
    PitchReading,
};
