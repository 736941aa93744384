//! Calibration worker thread.
//!
//! Owns the [`CalibrationEngine`] exclusively. Control commands and pitch
//! readings arrive on separate channels and control is always drained first,
//! so a cancel never waits behind queued readings. Between messages the
//! worker wakes every `poll_interval` to advance the state machine, so timed
//! phases end within one poll interval of their deadline.

use super::engine::{CalibrationConfig, CalibrationEngine, CalibrationEvent, CalibrationState};
use crate::error::{CalibrationError, Result};
use crossbeam_channel::{select, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use pitchhop_core::{Delivery, Listener, ListenerId, ListenerRegistry, SettingsStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Control commands understood by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationCommand {
    Start,
    Cancel,
    Shutdown,
}

/// Raw pitch reading from the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchReading {
    pub hz: f32,
    pub at: Instant,
}

/// Cheap, cloneable sender used by the pipeline thread.
#[derive(Debug, Clone)]
pub struct PitchFeed {
    tx: Sender<PitchReading>,
    state: Arc<CalibrationShared>,
}

impl PitchFeed {
    /// Whether a session is preparing, recording or analyzing.
    pub fn is_active(&self) -> bool {
        self.state.state().is_active()
    }

    /// Hand a pitch reading to the worker. Dropped if the queue is full.
    pub fn submit(&self, hz: f32, at: Instant) {
        match self.tx.try_send(PitchReading { hz, at }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Calibration queue full, dropping pitch"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// State shared between the worker and its handles.
pub struct CalibrationShared {
    state: AtomicU8,
    listeners: Mutex<ListenerRegistry<CalibrationEvent>>,
}

impl std::fmt::Debug for CalibrationShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationShared")
            .field("state", &self.state())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl CalibrationShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(CalibrationState::NotStarted as u8),
            listeners: Mutex::new(ListenerRegistry::new()),
        }
    }

    pub fn state(&self) -> CalibrationState {
        CalibrationState::from(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: CalibrationState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Where a successful calibration writes its result.
#[derive(Clone)]
pub struct CalibrationTarget {
    pub settings: Arc<SettingsStore>,
    /// Settings file to persist to after a successful calibration
    pub settings_path: Option<PathBuf>,
}

/// Handle to the calibration worker thread.
///
/// Dropping the handle shuts the worker down.
pub struct CalibrationWorker {
    control_tx: Sender<CalibrationCommand>,
    pitch_tx: Sender<PitchReading>,
    shared: Arc<CalibrationShared>,
    thread: Option<JoinHandle<()>>,
}

/// Queue depth for pitch readings.
const PITCH_QUEUE: usize = 1024;

impl CalibrationWorker {
    /// Spawn the worker thread.
    pub fn spawn(config: CalibrationConfig, target: CalibrationTarget) -> Result<Self> {
        Self::spawn_engine(CalibrationEngine::new(config), target)
    }

    /// Spawn the worker around a pre-built engine.
    pub fn spawn_engine(engine: CalibrationEngine, target: CalibrationTarget) -> Result<Self> {
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let (pitch_tx, pitch_rx) = crossbeam_channel::bounded(PITCH_QUEUE);
        let shared = Arc::new(CalibrationShared::new());
        let worker_shared = Arc::clone(&shared);

        let inbox = Inbox {
            control: control_rx,
            pitches: pitch_rx,
        };
        let thread = std::thread::Builder::new()
            .name("pitchhop-calibration".into())
            .spawn(move || calibration_loop(engine, inbox, &worker_shared, &target))?;

        Ok(Self {
            control_tx,
            pitch_tx,
            shared,
            thread: Some(thread),
        })
    }

    fn send(&self, command: CalibrationCommand) -> Result<()> {
        self.control_tx
            .send(command)
            .map_err(|_| CalibrationError::WorkerUnavailable)
    }

    /// Request a new session. Ignored by the worker while one is active.
    pub fn start(&self) -> Result<()> {
        self.send(CalibrationCommand::Start)
    }

    /// Cancel the active session, if any.
    pub fn cancel(&self) -> Result<()> {
        self.send(CalibrationCommand::Cancel)
    }

    /// Last state published by the worker.
    pub fn state(&self) -> CalibrationState {
        self.shared.state()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn feed(&self) -> PitchFeed {
        PitchFeed {
            tx: self.pitch_tx.clone(),
            state: Arc::clone(&self.shared),
        }
    }

    pub fn subscribe<L>(&self, delivery: Delivery, listener: L) -> ListenerId
    where
        L: Listener<CalibrationEvent> + 'static,
    {
        self.shared.listeners.lock().add(delivery, listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.listeners.lock().remove(id)
    }

    /// Stop the worker and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        let _ = self.control_tx.send(CalibrationCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Calibration worker panicked");
            }
        }
    }
}

impl Drop for CalibrationWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Receiving ends of the worker's two channels.
struct Inbox {
    control: Receiver<CalibrationCommand>,
    pitches: Receiver<PitchReading>,
}

#[derive(Debug, PartialEq)]
enum Message {
    Command(CalibrationCommand),
    Pitch(PitchReading),
    Idle,
    Disconnected,
}

impl Inbox {
    /// Next message, waiting at most `poll`. Pending control commands always
    /// come before pitch readings.
    fn next(&self, poll: Duration) -> Message {
        match self.control.try_recv() {
            Ok(command) => return Message::Command(command),
            Err(TryRecvError::Disconnected) => return Message::Disconnected,
            Err(TryRecvError::Empty) => {}
        }

        select! {
            recv(self.control) -> command => command.map_or(Message::Disconnected, Message::Command),
            recv(self.pitches) -> reading => reading.map_or(Message::Idle, Message::Pitch),
            default(poll) => Message::Idle,
        }
    }
}

fn calibration_loop(
    mut engine: CalibrationEngine,
    inbox: Inbox,
    shared: &CalibrationShared,
    target: &CalibrationTarget,
) {
    let poll = engine.config().poll_interval;
    info!("Calibration worker started");

    loop {
        let mut events = Vec::new();

        match inbox.next(poll) {
            Message::Command(CalibrationCommand::Start) => {
                events.extend(engine.start(Instant::now()))
            }
            Message::Command(CalibrationCommand::Cancel) => events.extend(engine.cancel()),
            Message::Pitch(PitchReading { hz, at }) => engine.on_pitch(hz, at),
            Message::Command(CalibrationCommand::Shutdown) | Message::Disconnected => {
                if let Some(event) = engine.cancel() {
                    shared.set_state(engine.state());
                    shared.listeners.lock().publish(&event);
                }
                break;
            }
            Message::Idle => {}
        }

        events.extend(engine.tick(Instant::now()));

        // Settings are updated before the state flips to Completed
        for event in &events {
            if let CalibrationEvent::Completed { base_pitch_hz, .. } = event {
                apply_base_pitch(*base_pitch_hz, target);
            }
        }
        shared.set_state(engine.state());

        if !events.is_empty() {
            let mut listeners = shared.listeners.lock();
            for event in &events {
                listeners.publish(event);
            }
        }
    }

    info!("Calibration worker stopped");
}

/// Publish the calibrated base pitch and persist it when a path is configured.
fn apply_base_pitch(base_pitch_hz: f32, target: &CalibrationTarget) {
    let settings = match target
        .settings
        .update(|settings| settings.base_pitch_hz = base_pitch_hz)
    {
        Ok(settings) => settings,
        Err(e) => {
            error!("Could not apply calibrated base pitch {:.2} Hz: {}", base_pitch_hz, e);
            return;
        }
    };

    if let Some(path) = &target.settings_path {
        if let Err(e) = settings.save_to(path) {
            warn!("Could not persist calibrated base pitch: {}", e);
        }
    }
}
