//! Error types for pitchhop-core.

use thiserror::Error;

/// Error type for pitchhop-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid base pitch: {0} Hz. Must be positive")]
    InvalidBasePitch(f32),

    #[error("Invalid frequency range: {min} - {max} Hz")]
    InvalidFrequencyRange { min: f32, max: f32 },

    #[error("Invalid stability settings: history={history}, threshold={threshold}")]
    InvalidStability { history: usize, threshold: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
