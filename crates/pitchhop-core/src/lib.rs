//! Core types shared by every pitchhop subsystem.
//!
//! # Primary API
//!
//! - [`frequency`]: Hz ↔ semitone conversion and note naming
//! - [`level`]: pitch → jump level mapping ([`jump_level`], [`frequency_for_level`])
//! - [`Settings`] / [`SettingsStore`]: immutable configuration snapshots swapped atomically
//! - [`ListenerRegistry`]: fan-out of events to registered listeners
//!
//! # Example
//!
//! ```
//! use pitchhop_core::{jump_level, Settings, SettingsStore};
//!
//! let store = SettingsStore::new(Settings::default());
//! let settings = store.load();
//!
//! // Two semitones above the calibrated base pitch
//! let hz = settings.base_pitch_hz * 2.0f32.powf(2.0 / 12.0);
//! assert_eq!(jump_level(hz, settings.base_pitch_hz), 2);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod frequency;
pub use frequency::{
    frequency_from_semitones, note_info, note_name, quantize_to_semitone, semitones_from_reference,
    NoteInfo, REFERENCE_PITCH_HZ,
};

pub mod level;
pub use level::{frequency_for_level, jump_level, ControlLevel, MAX_LEVEL};

mod settings;
pub use settings::{DetectionAlgorithm, Settings, SettingsStore, StabilityPreset, StabilitySettings};

mod listener;
pub use listener::{Delivery, Event, Listener, ListenerError, ListenerId, ListenerRegistry};

mod events;
pub use events::{JumpTrigger, PitchEvent};
