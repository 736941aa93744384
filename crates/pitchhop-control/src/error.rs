//! Error types for pitchhop-control

use thiserror::Error;

/// Result type for calibration operations
pub type Result<T> = std::result::Result<T, CalibrationError>;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Calibration needs at least {required} pitched samples, got {collected}")]
    InsufficientSamples { collected: usize, required: usize },

    #[error("Calibration analysis panicked: {0}")]
    AnalysisPanicked(String),

    #[error("Calibration worker is not running")]
    WorkerUnavailable,

    #[error("Failed to spawn calibration worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] pitchhop_core::Error),
}
