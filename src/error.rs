//! Centralized error type for the pitchhop umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] pitchhop_core::Error),

    #[error("Calibration: {0}")]
    Calibration(#[from] pitchhop_control::CalibrationError),

    #[error("Pipeline is not running")]
    NotRunning,

    #[error("Audio queue is full, block dropped")]
    QueueFull,

    #[error("No settings path configured")]
    NoSettingsPath,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
