//! Builder for configuring and constructing a `PitchHopEngine`.

use crate::live::{run_pipeline_thread, PipelineState};
use crate::pipeline::{JumpPipeline, PipelineListeners};
use crate::{PitchHopEngine, Result};
use pitchhop_analysis::{PitchDetector, PitchEstimator};
use pitchhop_control::calibration::CalibrationTarget;
use pitchhop_control::{CalibrationConfig, CalibrationWorker};
use pitchhop_core::{Settings, SettingsStore, StabilityPreset};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Blocks the pipeline may fall behind by before `push_block` rejects.
const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Settings come from, in order of precedence: [`settings`](Self::settings),
/// the file at [`settings_path`](Self::settings_path) if it exists, or
/// [`Settings::default`]. A preset, if given, is applied on top.
///
/// # Example
///
/// ```rust,no_run
/// use pitchhop::prelude::*;
///
/// let engine = PitchHopEngine::builder()
///     .settings_path("config/pitchhop.json")
///     .preset(StabilityPreset::Stable)
///     .build()?;
///
/// engine.start_calibration()?;
/// # Ok::<(), pitchhop::Error>(())
/// ```
pub struct PitchHopEngineBuilder {
    settings: Option<Settings>,
    settings_path: Option<PathBuf>,
    preset: Option<StabilityPreset>,
    estimator: Option<Box<dyn PitchEstimator>>,
    calibration: CalibrationConfig,
    queue_depth: usize,
}

impl Default for PitchHopEngineBuilder {
    fn default() -> Self {
        Self {
            settings: None,
            settings_path: None,
            preset: None,
            estimator: None,
            calibration: CalibrationConfig::default(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl PitchHopEngineBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Load settings from this file if it exists, and save there on
    /// `save_settings()` and after every successful calibration.
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn preset(mut self, preset: StabilityPreset) -> Self {
        self.preset = Some(preset);
        self
    }

    /// Use a custom estimator instead of the one selected in the settings.
    pub fn estimator(mut self, estimator: Box<dyn PitchEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn calibration(mut self, config: CalibrationConfig) -> Self {
        self.calibration = config;
        self
    }

    /// Default: 64
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    pub fn build(self) -> Result<PitchHopEngine> {
        let mut settings = match (self.settings, &self.settings_path) {
            (Some(settings), _) => settings,
            (None, Some(path)) if path.exists() => Settings::load_from(path)?,
            _ => Settings::default(),
        };
        if let Some(preset) = self.preset {
            settings = settings.with_preset(preset);
        }
        settings.validate()?;

        let detector = match self.estimator {
            Some(estimator) => PitchDetector::with_estimator(&settings, estimator),
            None => PitchDetector::new(&settings),
        };
        info!(
            "Building engine: {} estimator, {} Hz, base pitch {:.2} Hz",
            detector.estimator_name(),
            settings.sample_rate,
            settings.base_pitch_hz
        );

        let store = Arc::new(SettingsStore::new(settings));

        let calibration = CalibrationWorker::spawn(
            self.calibration,
            CalibrationTarget {
                settings: Arc::clone(&store),
                settings_path: self.settings_path.clone(),
            },
        )?;

        let listeners = Arc::new(PipelineListeners::default());
        let pipeline = JumpPipeline::new(Arc::clone(&store))
            .with_detector(detector)
            .with_listeners(Arc::clone(&listeners))
            .with_calibration(calibration.feed());

        let (audio_tx, audio_rx) = crossbeam_channel::bounded(self.queue_depth);
        let state = Arc::new(PipelineState::new(pipeline.block_size()));
        let thread_state = Arc::clone(&state);

        let thread = std::thread::Builder::new()
            .name("pitchhop-pipeline".into())
            .spawn(move || run_pipeline_thread(pipeline, audio_rx, thread_state))?;

        Ok(PitchHopEngine::from_parts(
            store,
            self.settings_path,
            audio_tx,
            listeners,
            state,
            thread,
            calibration,
        ))
    }
}
