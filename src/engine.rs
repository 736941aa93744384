//! PitchHopEngine that coordinates the pipeline thread and the calibration worker

use crate::live::PipelineState;
use crate::pipeline::PipelineListeners;
use crate::{Error, Result};
use crossbeam_channel::{Sender, TrySendError};
use pitchhop_analysis::AudioBlock;
use pitchhop_control::{CalibrationEvent, CalibrationState, CalibrationWorker};
use pitchhop_core::{
    Delivery, JumpTrigger, Listener, ListenerId, PitchEvent, Settings, SettingsStore,
    StabilityPreset,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Voice-to-jump engine.
///
/// Owns two threads:
/// - the pipeline thread, which turns audio blocks into pitch events and
///   jump triggers
/// - the calibration worker, which runs guided base-pitch sessions
///
/// Both read the same [`SettingsStore`]. A completed calibration writes the
/// new base pitch into it, and the pipeline picks it up on the next block.
///
/// # Example
///
/// ```rust,no_run
/// use pitchhop::prelude::*;
///
/// let engine = PitchHopEngine::builder()
///     .preset(StabilityPreset::Responsive)
///     .build()?;
///
/// engine.subscribe_triggers(|trigger: &JumpTrigger| {
///     println!("jump {}", trigger.level);
///     Ok::<(), ListenerError>(())
/// });
///
/// // Feed blocks from the capture callback
/// let block = AudioBlock::from_samples(&vec![0.0; engine.block_size()]);
/// engine.push_block(block)?;
/// # Ok::<(), pitchhop::Error>(())
/// ```
pub struct PitchHopEngine {
    settings: Arc<SettingsStore>,
    settings_path: Option<PathBuf>,

    /// None once shut down
    audio_tx: Option<Sender<AudioBlock>>,
    listeners: Arc<PipelineListeners>,
    pipeline_state: Arc<PipelineState>,
    pipeline_thread: Option<JoinHandle<()>>,

    calibration: CalibrationWorker,
}

impl PitchHopEngine {
    /// Create a new engine builder
    pub fn builder() -> crate::PitchHopEngineBuilder {
        crate::PitchHopEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        settings: Arc<SettingsStore>,
        settings_path: Option<PathBuf>,
        audio_tx: Sender<AudioBlock>,
        listeners: Arc<PipelineListeners>,
        pipeline_state: Arc<PipelineState>,
        pipeline_thread: JoinHandle<()>,
        calibration: CalibrationWorker,
    ) -> Self {
        Self {
            settings,
            settings_path,
            audio_tx: Some(audio_tx),
            listeners,
            pipeline_state,
            pipeline_thread: Some(pipeline_thread),
            calibration,
        }
    }

    // =========================================================================
    // Audio input
    // =========================================================================

    /// Queue one audio block for the pipeline thread.
    ///
    /// Never blocks. Returns [`Error::QueueFull`] if the pipeline is behind.
    pub fn push_block(&self, block: AudioBlock) -> Result<()> {
        let tx = self.audio_tx.as_ref().ok_or(Error::NotRunning)?;
        tx.try_send(block).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!("Pipeline queue full, dropping block");
                Error::QueueFull
            }
            TrySendError::Disconnected(_) => Error::NotRunning,
        })
    }

    /// Sender for capture sources that run on their own thread.
    pub fn audio_sender(&self) -> Result<Sender<AudioBlock>> {
        self.audio_tx.clone().ok_or(Error::NotRunning)
    }

    /// Samples per block the detector expects.
    pub fn block_size(&self) -> usize {
        self.pipeline_state.block_size()
    }

    pub fn is_running(&self) -> bool {
        self.pipeline_state.is_running()
    }

    pub fn blocks_processed(&self) -> u64 {
        self.pipeline_state.blocks_processed()
    }

    /// Most recent pitch event, if any block has been processed.
    pub fn latest_pitch(&self) -> Option<PitchEvent> {
        self.pipeline_state.latest.load_full().map(|event| *event)
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn subscribe_pitch<L>(&self, delivery: Delivery, listener: L) -> ListenerId
    where
        L: Listener<PitchEvent> + 'static,
    {
        self.listeners.pitch.lock().add(delivery, listener)
    }

    pub fn subscribe_triggers<L>(&self, listener: L) -> ListenerId
    where
        L: Listener<JumpTrigger> + 'static,
    {
        self.listeners
            .triggers
            .lock()
            .add(Delivery::EveryEvent, listener)
    }

    pub fn subscribe_calibration<L>(&self, listener: L) -> ListenerId
    where
        L: Listener<CalibrationEvent> + 'static,
    {
        self.calibration.subscribe(Delivery::EveryEvent, listener)
    }

    pub fn unsubscribe_pitch(&self, id: ListenerId) -> bool {
        self.listeners.pitch.lock().remove(id)
    }

    pub fn unsubscribe_triggers(&self, id: ListenerId) -> bool {
        self.listeners.triggers.lock().remove(id)
    }

    pub fn unsubscribe_calibration(&self, id: ListenerId) -> bool {
        self.calibration.unsubscribe(id)
    }

    // =========================================================================
    // Calibration
    // =========================================================================

    /// Begin a calibration session. Ignored while one is already running.
    pub fn start_calibration(&self) -> Result<()> {
        Ok(self.calibration.start()?)
    }

    pub fn cancel_calibration(&self) -> Result<()> {
        Ok(self.calibration.cancel()?)
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibration.state()
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load()
    }

    /// Apply `f` to a copy of the settings and publish it atomically.
    ///
    /// Invalid results are rejected and the current snapshot is kept.
    pub fn update_settings<F>(&self, f: F) -> Result<Arc<Settings>>
    where
        F: Fn(&mut Settings),
    {
        Ok(self.settings.update(f)?)
    }

    pub fn apply_preset(&self, preset: StabilityPreset) -> Result<Arc<Settings>> {
        info!("Applying {:?} stability preset", preset);
        self.update_settings(|settings| *settings = settings.clone().with_preset(preset))
    }

    /// Persist the current settings to the configured path.
    pub fn save_settings(&self) -> Result<()> {
        let path = self.settings_path.as_ref().ok_or(Error::NoSettingsPath)?;
        Ok(self.settings.load().save_to(path)?)
    }

    pub fn settings_path(&self) -> Option<&Path> {
        self.settings_path.as_deref()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop both threads and wait for them. Idempotent.
    pub fn shutdown(&mut self) {
        self.audio_tx = None;
        self.pipeline_state.stop();
        if let Some(handle) = self.pipeline_thread.take() {
            if handle.join().is_err() {
                warn!("Pipeline thread panicked");
            }
        }
        self.calibration.shutdown();
    }
}

impl Drop for PitchHopEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
