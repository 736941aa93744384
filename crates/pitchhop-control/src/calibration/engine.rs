//! Calibration session state machine.
//!
//! The engine performs no waiting of its own. The owner advances it with
//! [`CalibrationEngine::tick`] and feeds pitch values with
//! [`CalibrationEngine::on_pitch`]; every call returns the lifecycle events it
//! produced so the owner can publish them.

use super::stats::{estimate_base_pitch, BasePitchEstimate, CalibrationMode};
use crate::error::{CalibrationError, Result};
use pitchhop_core::{note_name, Event};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Calibration session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CalibrationState {
    #[default]
    NotStarted = 0,
    /// Countdown before recording
    Preparing = 1,
    /// Collecting pitch samples
    Recording = 2,
    /// Deriving the base pitch
    Analyzing = 3,
    Completed = 4,
    Failed = 5,
}

impl CalibrationState {
    /// Preparing, recording or analyzing.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            CalibrationState::Preparing | CalibrationState::Recording | CalibrationState::Analyzing
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CalibrationState::Completed | CalibrationState::Failed)
    }
}

impl From<u8> for CalibrationState {
    fn from(value: u8) -> Self {
        match value {
            0 => CalibrationState::NotStarted,
            1 => CalibrationState::Preparing,
            2 => CalibrationState::Recording,
            3 => CalibrationState::Analyzing,
            4 => CalibrationState::Completed,
            _ => CalibrationState::Failed,
        }
    }
}

/// Lifecycle events published to calibration listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationEvent {
    /// Human-readable progress message
    Status(String),
    /// Countdown before recording; `remaining` reaches 1 on the last tick
    CountdownTick { remaining: u32 },
    /// Pitch samples appended since the previous batch
    SamplesRecorded { total: usize, batch: Vec<f32> },
    Completed {
        base_pitch_hz: f32,
        note_name: String,
    },
    Failed,
}

impl Event for CalibrationEvent {}

/// Timing and acceptance parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Countdown ticks before recording starts
    pub countdown_ticks: u32,
    pub tick_interval: Duration,
    pub recording_duration: Duration,
    /// Pause between the end of recording and the analysis
    pub analysis_delay: Duration,
    /// Pitched samples needed for a result
    pub min_samples: usize,
    /// Longest the worker waits between ticks
    pub poll_interval: Duration,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            tick_interval: Duration::from_secs(1),
            recording_duration: Duration::from_secs(5),
            analysis_delay: Duration::from_millis(500),
            min_samples: 10,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Analysis step. Replaceable so faults in it can be exercised.
pub type Analyzer = fn(&[f32], CalibrationMode, usize) -> Result<BasePitchEstimate>;

/// Data owned by one calibration attempt. Reset on every start.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    pub started_at: Instant,
    pub samples: Vec<f32>,
    pub base_pitch_hz: Option<f32>,
    pub note_name: Option<String>,
    /// Next countdown tick, end of recording or start of analysis
    deadline: Instant,
    countdown_remaining: u32,
    /// Samples not yet reported in a `SamplesRecorded` batch
    unreported: usize,
}

pub struct CalibrationEngine {
    config: CalibrationConfig,
    analyzer: Analyzer,
    state: CalibrationState,
    session: Option<CalibrationSession>,
    /// Sessions started over the engine's lifetime. Every session after the
    /// first re-calibrates, whatever the earlier outcome.
    sessions_started: u32,
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig) -> Self {
        Self::with_analyzer(config, estimate_base_pitch)
    }

    pub fn with_analyzer(config: CalibrationConfig, analyzer: Analyzer) -> Self {
        Self {
            config,
            analyzer,
            state: CalibrationState::NotStarted,
            session: None,
            sessions_started: 0,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn session(&self) -> Option<&CalibrationSession> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Mode of the current (or most recent) session.
    pub fn mode(&self) -> CalibrationMode {
        if self.sessions_started > 1 {
            CalibrationMode::Recalibration
        } else {
            CalibrationMode::First
        }
    }

    /// Begin a fresh session. No-op while a session is active.
    pub fn start(&mut self, now: Instant) -> Vec<CalibrationEvent> {
        if self.state.is_active() {
            debug!("Calibration already running ({:?}), ignoring start", self.state);
            return Vec::new();
        }

        self.sessions_started = self.sessions_started.saturating_add(1);
        info!("Calibration started ({:?})", self.mode());
        self.session = Some(CalibrationSession {
            started_at: now,
            samples: Vec::new(),
            base_pitch_hz: None,
            note_name: None,
            deadline: now + self.config.tick_interval,
            countdown_remaining: self.config.countdown_ticks,
            unreported: 0,
        });

        let mut events = vec![CalibrationEvent::Status(
            "Get ready to sing your lowest comfortable note".into(),
        )];
        if self.config.countdown_ticks == 0 {
            self.begin_recording(now, &mut events);
        } else {
            self.state = CalibrationState::Preparing;
            events.push(CalibrationEvent::CountdownTick {
                remaining: self.config.countdown_ticks,
            });
        }
        events
    }

    /// Abandon the active session and return to `NotStarted`.
    ///
    /// Returns `None` if no session was active.
    pub fn cancel(&mut self) -> Option<CalibrationEvent> {
        if !self.state.is_active() {
            return None;
        }
        info!("Calibration cancelled during {:?}", self.state);
        self.state = CalibrationState::NotStarted;
        self.session = None;
        Some(CalibrationEvent::Status("Calibration cancelled".into()))
    }

    /// Record a pitch reading. Only positive pitches during recording are kept.
    pub fn on_pitch(&mut self, hz: f32, at: Instant) {
        if self.state != CalibrationState::Recording || !(hz > 0.0) || !hz.is_finite() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if at < session.deadline {
                session.samples.push(hz);
                session.unreported += 1;
            }
        }
    }

    /// Advance the workflow to `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<CalibrationEvent> {
        let mut events = Vec::new();

        if self.state == CalibrationState::Preparing {
            self.advance_countdown(now, &mut events);
        }
        if self.state == CalibrationState::Recording {
            self.flush_batch(&mut events);
            if self.deadline_passed(now) {
                let collected = self.session.as_ref().map_or(0, |s| s.samples.len());
                debug!("Recording finished with {} samples", collected);
                self.state = CalibrationState::Analyzing;
                if let Some(session) = self.session.as_mut() {
                    session.deadline = now + self.config.analysis_delay;
                }
                events.push(CalibrationEvent::Status("Analyzing...".into()));
            }
        }
        if self.state == CalibrationState::Analyzing && self.deadline_passed(now) {
            self.finish(&mut events);
        }

        events
    }

    fn deadline_passed(&self, now: Instant) -> bool {
        self.session.as_ref().is_some_and(|s| now >= s.deadline)
    }

    fn advance_countdown(&mut self, now: Instant, events: &mut Vec<CalibrationEvent>) {
        let interval = self.config.tick_interval;
        let mut start_recording = false;

        if let Some(session) = self.session.as_mut() {
            while now >= session.deadline && session.countdown_remaining > 0 {
                session.countdown_remaining -= 1;
                if session.countdown_remaining == 0 {
                    start_recording = true;
                    break;
                }
                events.push(CalibrationEvent::CountdownTick {
                    remaining: session.countdown_remaining,
                });
                session.deadline += interval;
            }
        }

        if start_recording {
            self.begin_recording(now, events);
        }
    }

    fn begin_recording(&mut self, now: Instant, events: &mut Vec<CalibrationEvent>) {
        self.state = CalibrationState::Recording;
        if let Some(session) = self.session.as_mut() {
            session.deadline = now + self.config.recording_duration;
        }
        events.push(CalibrationEvent::Status("Sing now!".into()));
    }

    fn flush_batch(&mut self, events: &mut Vec<CalibrationEvent>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.unreported == 0 {
            return;
        }
        let total = session.samples.len();
        let batch = session.samples[total - session.unreported..].to_vec();
        session.unreported = 0;
        events.push(CalibrationEvent::SamplesRecorded { total, batch });
    }

    fn finish(&mut self, events: &mut Vec<CalibrationEvent>) {
        let mode = self.mode();
        let Some(session) = self.session.as_mut() else {
            self.state = CalibrationState::Failed;
            events.push(CalibrationEvent::Failed);
            return;
        };

        let analyzer = self.analyzer;
        let samples = &session.samples;
        let min_samples = self.config.min_samples;

        let outcome = catch_unwind(AssertUnwindSafe(|| analyzer(samples, mode, min_samples)))
            .unwrap_or_else(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(CalibrationError::AnalysisPanicked(message))
            });

        match outcome {
            Ok(estimate) => {
                let name = note_name(estimate.base_pitch_hz);
                info!(
                    "Calibration complete: {:.2} Hz ({}) via {:?}, {} kept, {} removed",
                    estimate.base_pitch_hz, name, estimate.selection, estimate.kept, estimate.removed
                );
                session.base_pitch_hz = Some(estimate.base_pitch_hz);
                session.note_name = Some(name.clone());
                self.state = CalibrationState::Completed;
                events.push(CalibrationEvent::Completed {
                    base_pitch_hz: estimate.base_pitch_hz,
                    note_name: name,
                });
            }
            Err(e) => {
                warn!("Calibration failed: {}", e);
                self.state = CalibrationState::Failed;
                events.push(CalibrationEvent::Failed);
            }
        }
    }
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}
