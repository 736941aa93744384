//! Engine lifecycle, block intake and jump trigger tests

use crate::helpers::tolerances::pitch_close;
use crate::helpers::*;
use parking_lot::Mutex;
use pitchhop::prelude::*;
use pitchhop::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_engine_creation() {
    let engine = test_engine(StabilityPreset::Balanced);

    assert!(engine.is_running());
    assert_eq!(engine.block_size(), 1470);
    assert_eq!(engine.blocks_processed(), 0);
    assert!(engine.latest_pitch().is_none());
    assert_eq!(engine.calibration_state(), CalibrationState::NotStarted);
    assert!(engine.settings_path().is_none());
}

#[test]
fn test_sustained_octave_triggers_level_twelve() {
    let engine = test_engine(StabilityPreset::Responsive);
    let base = engine.settings().base_pitch_hz;

    let levels = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&levels);
    engine.subscribe_triggers(move |trigger: &JumpTrigger| {
        sink.lock().push(trigger.level);
        Ok::<(), ListenerError>(())
    });

    let mut source = SineSource::new(base * 2.0, 0.5);
    stream_while(&engine, &mut source, Duration::from_secs(3), || {
        levels.lock().is_empty()
    });

    assert!(wait_until(Duration::from_secs(1), || !levels.lock().is_empty()));
    assert_eq!(levels.lock()[0], 12);

    let latest = engine.latest_pitch().expect("pitch event published");
    assert!(pitch_close(latest.pitch_hz, base * 2.0));
    assert_eq!(latest.level, 12);
}

#[test]
fn test_silence_never_triggers() {
    let engine = test_engine(StabilityPreset::Responsive);

    let every = Arc::new(AtomicUsize::new(0));
    let pitched = Arc::new(AtomicUsize::new(0));
    let triggers = Arc::new(AtomicUsize::new(0));

    let c = Arc::clone(&every);
    engine.subscribe_pitch(Delivery::EveryEvent, move |event: &PitchEvent| {
        assert_eq!(event.level, 0);
        c.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ListenerError>(())
    });
    let c = Arc::clone(&pitched);
    engine.subscribe_pitch(Delivery::PitchedOnly, move |_: &PitchEvent| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ListenerError>(())
    });
    let c = Arc::clone(&triggers);
    engine.subscribe_triggers(move |_: &JumpTrigger| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ListenerError>(())
    });

    for _ in 0..10 {
        engine.push_block(silent_block(engine.block_size())).unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || engine.blocks_processed() == 10));
    assert_eq!(every.load(Ordering::SeqCst), 10);
    assert_eq!(pitched.load(Ordering::SeqCst), 0);
    assert_eq!(triggers.load(Ordering::SeqCst), 0);
}

#[test]
fn test_quiet_tone_below_volume_threshold_is_ignored() {
    let engine = test_engine(StabilityPreset::Responsive);
    let triggers = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&triggers);
    engine.subscribe_triggers(move |_: &JumpTrigger| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ListenerError>(())
    });

    // About -66 dBFS, well under the default -40 dB threshold
    let mut source = SineSource::new(261.63, 0.0007);
    for _ in 0..8 {
        engine.push_block(source.next_block(engine.block_size())).unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || engine.blocks_processed() == 8));
    let latest = engine.latest_pitch().unwrap();
    assert_eq!(latest.pitch_hz, 0.0);
    assert_eq!(triggers.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let engine = test_engine(StabilityPreset::Balanced);
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    let id = engine.subscribe_pitch(Delivery::EveryEvent, move |_: &PitchEvent| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ListenerError>(())
    });

    engine.push_block(silent_block(engine.block_size())).unwrap();
    assert!(wait_until(Duration::from_secs(2), || count.load(Ordering::SeqCst) == 1));

    assert!(engine.unsubscribe_pitch(id));
    assert!(!engine.unsubscribe_pitch(id));

    engine.push_block(silent_block(engine.block_size())).unwrap();
    assert!(wait_until(Duration::from_secs(2), || engine.blocks_processed() == 2));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_listener_does_not_block_others() {
    let engine = test_engine(StabilityPreset::Balanced);
    let count = Arc::new(AtomicUsize::new(0));

    engine.subscribe_pitch(Delivery::EveryEvent, |_: &PitchEvent| {
        Err(ListenerError::new("display gone"))
    });
    let c = Arc::clone(&count);
    engine.subscribe_pitch(Delivery::EveryEvent, move |_: &PitchEvent| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ListenerError>(())
    });

    for _ in 0..3 {
        engine.push_block(silent_block(engine.block_size())).unwrap();
    }
    assert!(wait_until(Duration::from_secs(2), || count.load(Ordering::SeqCst) == 3));
}

#[test]
fn test_audio_sender_from_capture_thread() {
    let engine = test_engine(StabilityPreset::Balanced);
    let sender = engine.audio_sender().unwrap();
    let block_size = engine.block_size();

    let capture = std::thread::spawn(move || {
        let mut source = SineSource::new(220.0, 0.5);
        for _ in 0..5 {
            sender.send(source.next_block(block_size)).unwrap();
        }
    });
    capture.join().unwrap();

    assert!(wait_until(Duration::from_secs(2), || engine.blocks_processed() == 5));
    let latest = engine.latest_pitch().unwrap();
    assert!(pitch_close(latest.pitch_hz, 220.0));
}

#[test]
fn test_shutdown_is_idempotent() {
    let mut engine = test_engine(StabilityPreset::Balanced);
    engine.shutdown();
    engine.shutdown();

    assert!(!engine.is_running());
    assert!(matches!(
        engine.push_block(silent_block(1470)),
        Err(Error::NotRunning)
    ));
    assert!(matches!(engine.audio_sender(), Err(Error::NotRunning)));
}

#[test]
fn test_drop_joins_threads() {
    let engine = test_engine(StabilityPreset::Balanced);
    engine.push_block(silent_block(engine.block_size())).unwrap();
    drop(engine);
}
