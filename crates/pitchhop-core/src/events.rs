//! Events emitted by the pitch pipeline.

use crate::listener::Event;
use crate::ControlLevel;
use std::time::Instant;

/// Emitted once per processed audio block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEvent {
    /// Smoothed pitch in Hz (0.0 when the block carried no valid pitch)
    pub pitch_hz: f32,
    /// Block level in dBFS
    pub audio_level_db: f32,
    /// Base pitch the level was computed against
    pub base_pitch_hz: f32,
    pub level: ControlLevel,
    pub timestamp: Instant,
}

impl Event for PitchEvent {
    fn has_pitch(&self) -> bool {
        self.pitch_hz > 0.0
    }
}

/// A debounced jump fired by the stability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTrigger {
    /// Jump intensity in `[1, MAX_LEVEL]`
    pub level: ControlLevel,
    pub timestamp: Instant,
}

impl Event for JumpTrigger {}
