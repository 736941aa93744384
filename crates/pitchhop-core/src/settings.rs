//! Settings snapshots.
//!
//! [`Settings`] is never mutated in place once published. Writers build a new
//! snapshot and swap it into the [`SettingsStore`]; readers take one snapshot
//! per unit of work and so always see a consistent configuration.

use crate::{Error, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Pitch estimation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionAlgorithm {
    /// Cumulative mean normalized difference (de Cheveigné & Kawahara)
    #[default]
    Yin,
    /// Normalized square difference with key maxima (McLeod & Wyvill)
    McLeod,
}

/// Debounce parameters for the stability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilitySettings {
    /// Number of recent levels kept.
    pub history: usize,
    /// Levels that must accumulate before a trigger may fire.
    pub threshold: usize,
    /// Minimum time between two triggers.
    pub min_interval_ms: u64,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        StabilityPreset::Balanced.stability()
    }
}

/// Named stability presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityPreset {
    /// Short history, fires after 2 levels
    Responsive,
    #[default]
    Balanced,
    /// Long history, fires after 4 levels
    Stable,
}

impl StabilityPreset {
    pub fn stability(self) -> StabilitySettings {
        let (history, threshold) = match self {
            StabilityPreset::Responsive => (3, 2),
            StabilityPreset::Balanced => (5, 3),
            StabilityPreset::Stable => (7, 4),
        };
        StabilitySettings {
            history,
            threshold,
            min_interval_ms: 300,
        }
    }
}

/// Immutable configuration snapshot read by the pipeline and calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Calibrated base pitch (level 0), in Hz.
    pub base_pitch_hz: f32,
    /// Blocks at or below this level (dBFS) carry no pitch.
    pub volume_threshold_db: f32,
    pub stability: StabilitySettings,
    /// Lowest detectable frequency; also dictates the analysis block size.
    pub min_frequency_hz: f32,
    /// Estimates above this are rejected.
    pub max_frequency_hz: f32,
    pub sample_rate: u32,
    pub algorithm: DetectionAlgorithm,
    /// Pre-filter coefficient (0 < alpha <= 1).
    pub pre_filter_alpha: f32,
    /// Rolling average length for validated estimates.
    pub smoothing_window: usize,
    /// Estimator confidence below which a block counts as unpitched.
    pub min_confidence: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_pitch_hz: 130.81, // C3
            volume_threshold_db: -40.0,
            stability: StabilitySettings::default(),
            min_frequency_hz: 60.0,
            max_frequency_hz: 1000.0,
            sample_rate: 44100,
            algorithm: DetectionAlgorithm::default(),
            pre_filter_alpha: 0.2,
            smoothing_window: 5,
            min_confidence: 0.5,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(self.base_pitch_hz > 0.0) || !self.base_pitch_hz.is_finite() {
            return Err(Error::InvalidBasePitch(self.base_pitch_hz));
        }
        if self.sample_rate < 8000 || self.sample_rate > 384000 {
            return Err(Error::InvalidSettings(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if !(self.min_frequency_hz > 0.0)
            || self.min_frequency_hz >= self.max_frequency_hz
            || self.max_frequency_hz > nyquist
        {
            return Err(Error::InvalidFrequencyRange {
                min: self.min_frequency_hz,
                max: self.max_frequency_hz,
            });
        }
        let stability = &self.stability;
        if stability.history == 0 || stability.threshold == 0 || stability.threshold > stability.history {
            return Err(Error::InvalidStability {
                history: stability.history,
                threshold: stability.threshold,
            });
        }
        if !(self.pre_filter_alpha > 0.0 && self.pre_filter_alpha <= 1.0) {
            return Err(Error::InvalidSettings(format!(
                "pre_filter_alpha {} out of range (0-1]",
                self.pre_filter_alpha
            )));
        }
        if self.smoothing_window == 0 {
            return Err(Error::InvalidSettings("smoothing_window must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidSettings(format!(
                "min_confidence {} out of range (0-1)",
                self.min_confidence
            )));
        }
        Ok(())
    }

    /// Replace the stability parameters with a preset, keeping the cooldown.
    pub fn with_preset(mut self, preset: StabilityPreset) -> Self {
        let min_interval_ms = self.stability.min_interval_ms;
        self.stability = StabilitySettings {
            min_interval_ms,
            ..preset.stability()
        };
        self
    }

    /// Load and validate settings from a JSON file.
    ///
    /// Missing keys fall back to their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty-printed JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }
}

/// Holder of the current [`Settings`] snapshot.
///
/// Reads are lock-free. Writes validate the new snapshot and publish it with a
/// single atomic swap, so readers never observe a half-applied change.
pub struct SettingsStore {
    current: ArcSwap<Settings>,
}

impl SettingsStore {
    /// Create a store. The initial snapshot is published as-is.
    pub fn new(settings: Settings) -> Self {
        Self {
            current: ArcSwap::from_pointee(settings),
        }
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<Settings> {
        self.current.load_full()
    }

    /// Publish a complete replacement snapshot.
    pub fn store(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.current.store(Arc::new(settings));
        Ok(())
    }

    /// Read-copy-update: apply `f` to a copy of the current snapshot and publish it.
    ///
    /// `f` may run more than once if another writer races this one. Invalid
    /// results are rejected and the current snapshot is left untouched.
    pub fn update<F>(&self, f: F) -> Result<Arc<Settings>>
    where
        F: Fn(&mut Settings),
    {
        let mut rejected = None;
        self.current.rcu(|current| {
            rejected = None;
            let mut next = Settings::clone(current);
            f(&mut next);
            match next.validate() {
                Ok(()) => Arc::new(next),
                Err(e) => {
                    rejected = Some(e);
                    Arc::clone(current)
                }
            }
        });

        match rejected {
            Some(e) => Err(e),
            None => Ok(self.load()),
        }
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
