//! Guided calibration driven through the engine threads

use crate::helpers::tolerances::SEMITONE_HZ_EPSILON;
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use parking_lot::Mutex;
use pitchhop::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Subscribe a listener that records every calibration event.
fn record_events(engine: &PitchHopEngine) -> Arc<Mutex<Vec<CalibrationEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.subscribe_calibration(move |event: &CalibrationEvent| {
        sink.lock().push(event.clone());
        Ok::<(), ListenerError>(())
    });
    events
}

#[test]
fn test_calibration_learns_sung_pitch() {
    let engine = test_engine(StabilityPreset::Responsive);
    let events = record_events(&engine);
    let triggers = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&triggers);
    engine.subscribe_triggers(move |trigger: &JumpTrigger| {
        sink.lock().push(trigger.level);
        Ok::<(), ListenerError>(())
    });

    engine.start_calibration().unwrap();
    assert!(wait_until(Duration::from_secs(1), || {
        engine.calibration_state().is_active()
    }));

    let mut source = SineSource::new(220.0, 0.5);
    stream_while(&engine, &mut source, Duration::from_secs(5), || {
        !engine.calibration_state().is_terminal()
    });

    assert_eq!(engine.calibration_state(), CalibrationState::Completed);
    assert_abs_diff_eq!(engine.settings().base_pitch_hz, 220.0, epsilon = SEMITONE_HZ_EPSILON);
    assert!(triggers.lock().is_empty(), "no jumps while calibrating");

    // Events are published after the state flips
    assert!(wait_until(Duration::from_secs(1), || {
        matches!(events.lock().last(), Some(CalibrationEvent::Completed { .. }))
    }));
    let events = events.lock();
    let ticks: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            CalibrationEvent::CountdownTick { remaining } => Some(*remaining),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![2, 1]);
    assert!(events
        .iter()
        .any(|e| matches!(e, CalibrationEvent::SamplesRecorded { .. })));
    match events.last() {
        Some(CalibrationEvent::Completed {
            base_pitch_hz,
            note_name,
        }) => {
            assert_abs_diff_eq!(*base_pitch_hz, 220.0, epsilon = SEMITONE_HZ_EPSILON);
            assert_eq!(note_name, "A3");
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

#[test]
fn test_new_base_pitch_drives_levels() {
    let engine = test_engine(StabilityPreset::Responsive);
    engine.start_calibration().unwrap();

    let mut source = SineSource::new(220.0, 0.5);
    stream_while(&engine, &mut source, Duration::from_secs(5), || {
        !engine.calibration_state().is_terminal()
    });
    assert_eq!(engine.calibration_state(), CalibrationState::Completed);

    let levels = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&levels);
    engine.subscribe_triggers(move |trigger: &JumpTrigger| {
        sink.lock().push(trigger.level);
        Ok::<(), ListenerError>(())
    });

    // One octave above the learned base
    source.set_frequency(440.0);
    stream_while(&engine, &mut source, Duration::from_secs(3), || {
        !levels.lock().contains(&12)
    });
    assert!(levels.lock().contains(&12));
}

#[test]
fn test_silent_calibration_fails_and_keeps_base_pitch() {
    let engine = test_engine(StabilityPreset::Balanced);
    let before = engine.settings().base_pitch_hz;
    let events = record_events(&engine);

    engine.start_calibration().unwrap();
    let finished = wait_until(Duration::from_secs(5), || {
        let _ = engine.push_block(silent_block(engine.block_size()));
        std::thread::sleep(Duration::from_millis(3));
        engine.calibration_state().is_terminal()
    });

    assert!(finished, "calibration stuck in {:?}", engine.calibration_state());
    assert_eq!(engine.calibration_state(), CalibrationState::Failed);
    assert_eq!(engine.settings().base_pitch_hz, before);
    assert!(wait_until(Duration::from_secs(1), || {
        matches!(events.lock().last(), Some(CalibrationEvent::Failed))
    }));
}

#[test]
fn test_cancel_leaves_settings_untouched() {
    let engine = test_engine(StabilityPreset::Balanced);
    let before = engine.settings().base_pitch_hz;
    let events = record_events(&engine);

    engine.start_calibration().unwrap();
    assert!(wait_until(Duration::from_secs(1), || {
        engine.calibration_state().is_active()
    }));
    engine.cancel_calibration().unwrap();

    assert!(wait_until(Duration::from_secs(1), || {
        engine.calibration_state() == CalibrationState::NotStarted
    }));
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(engine.settings().base_pitch_hz, before);
    let events = events.lock();
    assert!(!events.iter().any(|e| matches!(
        e,
        CalibrationEvent::Completed { .. } | CalibrationEvent::Failed
    )));
}

#[test]
fn test_completed_calibration_is_persisted() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pitchhop.json");

    {
        let engine = PitchHopEngine::builder()
            .settings_path(&path)
            .calibration(fast_calibration())
            .build()
            .unwrap();
        engine.start_calibration().unwrap();

        let mut source = SineSource::new(196.0, 0.5); // G3
        stream_while(&engine, &mut source, Duration::from_secs(5), || {
            !engine.calibration_state().is_terminal()
        });
        assert_eq!(engine.calibration_state(), CalibrationState::Completed);
    }

    let reloaded = PitchHopEngine::builder()
        .settings_path(&path)
        .build()
        .unwrap();
    assert_abs_diff_eq!(reloaded.settings().base_pitch_hz, 196.0, epsilon = SEMITONE_HZ_EPSILON);
}

#[test]
fn test_panicking_calibration_listener_does_not_stall_engine() {
    let engine = test_engine(StabilityPreset::Responsive);
    engine.subscribe_calibration(|event: &CalibrationEvent| {
        if matches!(event, CalibrationEvent::Status(msg) if msg == "Sing now!") {
            panic!("overlay crashed");
        }
        Ok::<(), ListenerError>(())
    });

    engine.start_calibration().unwrap();
    let mut source = SineSource::new(220.0, 0.5);
    stream_while(&engine, &mut source, Duration::from_secs(5), || {
        !engine.calibration_state().is_terminal()
    });
    assert_eq!(engine.calibration_state(), CalibrationState::Completed);

    // Jumps resume once the session is over
    let levels = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&levels);
    engine.subscribe_triggers(move |trigger: &JumpTrigger| {
        sink.lock().push(trigger.level);
        Ok::<(), ListenerError>(())
    });
    source.set_frequency(440.0);
    stream_while(&engine, &mut source, Duration::from_secs(3), || {
        levels.lock().is_empty()
    });
    assert!(!levels.lock().is_empty());

    engine.start_calibration().unwrap();
    assert!(wait_until(Duration::from_secs(1), || {
        engine.calibration_state().is_active()
    }));
}
