//! Integration test modules for pitchhop
//!
//! - engine: Engine lifecycle, block intake, triggers
//! - calibration: Guided sessions driven through the engine
//! - settings: Snapshot updates and persistence

pub mod calibration;
pub mod engine;
pub mod settings;
