//! Block → pitch → level → gate, one block at a time.

use parking_lot::Mutex;
use pitchhop_analysis::{AudioBlock, Detection, PitchDetector};
use pitchhop_control::{PitchFeed, StabilityGate};
use pitchhop_core::{
    jump_level, JumpTrigger, ListenerRegistry, PitchEvent, Settings, SettingsStore,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Listener registries shared between the engine handle and the pipeline.
#[derive(Default)]
pub struct PipelineListeners {
    pub pitch: Mutex<ListenerRegistry<PitchEvent>>,
    pub triggers: Mutex<ListenerRegistry<JumpTrigger>>,
}

/// Everything one block produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockOutcome {
    pub detection: Detection,
    pub event: PitchEvent,
    pub trigger: Option<JumpTrigger>,
}

/// Synchronous pitch-to-trigger pipeline.
///
/// Owns the detector and the stability gate. Loads exactly one settings
/// snapshot per block, so a concurrent settings change applies from the next
/// block on. While a calibration session is active the gate is held empty,
/// levels are reported as 0 and valid pitches go to the calibration worker.
///
/// # Example
///
/// ```rust
/// use pitchhop::{AudioBlock, JumpPipeline, SettingsStore};
/// use std::sync::Arc;
/// use std::time::Instant;
///
/// let settings = Arc::new(SettingsStore::default());
/// let mut pipeline = JumpPipeline::new(settings);
///
/// let silence = AudioBlock::from_samples(&vec![0.0; pipeline.block_size()]);
/// let outcome = pipeline.process_block(&silence, Instant::now());
/// assert_eq!(outcome.event.level, 0);
/// assert!(outcome.trigger.is_none());
/// ```
pub struct JumpPipeline {
    settings: Arc<SettingsStore>,
    applied: Arc<Settings>,
    detector: PitchDetector,
    gate: StabilityGate,
    calibration: Option<PitchFeed>,
    listeners: Arc<PipelineListeners>,
}

impl JumpPipeline {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        let applied = settings.load();
        Self {
            detector: PitchDetector::new(&applied),
            gate: StabilityGate::new(&applied.stability),
            settings,
            applied,
            calibration: None,
            listeners: Arc::new(PipelineListeners::default()),
        }
    }

    /// Replace the detector, e.g. one built around a custom estimator.
    pub fn with_detector(mut self, detector: PitchDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_listeners(mut self, listeners: Arc<PipelineListeners>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Route pitches to a calibration worker while it is active.
    pub fn with_calibration(mut self, feed: PitchFeed) -> Self {
        self.calibration = Some(feed);
        self
    }

    pub fn listeners(&self) -> Arc<PipelineListeners> {
        Arc::clone(&self.listeners)
    }

    /// Samples per block the detector needs.
    pub fn block_size(&self) -> usize {
        self.detector.block_size()
    }

    fn refresh_settings(&mut self) -> Arc<Settings> {
        let snapshot = self.settings.load();
        if !Arc::ptr_eq(&snapshot, &self.applied) {
            debug!("Applying new settings snapshot");
            self.detector.reconfigure(&snapshot);
            self.gate.reconfigure(&snapshot.stability);
            self.applied = Arc::clone(&snapshot);
        }
        snapshot
    }

    /// Process one block and publish its events.
    pub fn process_block(&mut self, block: &AudioBlock, now: Instant) -> BlockOutcome {
        let settings = self.refresh_settings();
        let detection = self.detector.process(block, &settings, now);
        let pitch = detection.pitch;

        let calibration = self.calibration.as_ref().filter(|feed| feed.is_active());
        let (level, trigger) = match calibration {
            Some(feed) => {
                self.gate.clear();
                if pitch.is_valid {
                    feed.submit(detection.sample.frequency_hz, now);
                }
                (0, None)
            }
            None => {
                let level = if pitch.is_valid {
                    jump_level(pitch.smoothed_hz, settings.base_pitch_hz)
                } else {
                    0
                };
                let trigger = self.gate.process(pitch.is_valid.then_some(level), now);
                (level, trigger)
            }
        };

        let event = PitchEvent {
            pitch_hz: pitch.smoothed_hz,
            audio_level_db: block.level_db,
            base_pitch_hz: settings.base_pitch_hz,
            level,
            timestamp: now,
        };
        self.listeners.pitch.lock().publish(&event);

        if let Some(trigger) = &trigger {
            debug!("Jump level {} at {:.1} Hz", trigger.level, pitch.smoothed_hz);
            self.listeners.triggers.lock().publish(trigger);
        }

        BlockOutcome {
            detection,
            event,
            trigger,
        }
    }
}
