//! Settings snapshots, presets and persistence through the engine

use crate::helpers::*;
use pitchhop::prelude::*;
use pitchhop::Error;

#[test]
fn test_apply_preset_updates_stability() {
    let engine = test_engine(StabilityPreset::Balanced);
    assert_eq!(engine.settings().stability.threshold, 3);

    let updated = engine.apply_preset(StabilityPreset::Stable).unwrap();
    assert_eq!(updated.stability.history, 7);
    assert_eq!(updated.stability.threshold, 4);
    assert_eq!(engine.settings().stability, updated.stability);
}

#[test]
fn test_invalid_update_keeps_previous_snapshot() {
    let engine = test_engine(StabilityPreset::Balanced);
    let before = engine.settings();

    let result = engine.update_settings(|s| s.base_pitch_hz = -1.0);
    assert!(matches!(result, Err(Error::Core(_))));
    assert_eq!(*engine.settings(), *before);
}

#[test]
fn test_save_without_path_is_rejected() {
    let engine = test_engine(StabilityPreset::Balanced);
    assert!(matches!(engine.save_settings(), Err(Error::NoSettingsPath)));
}

#[test]
fn test_save_and_reload_round_trip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    {
        let engine = PitchHopEngine::builder()
            .settings_path(&path)
            .build()
            .unwrap();
        engine
            .update_settings(|s| {
                s.base_pitch_hz = 174.61;
                s.volume_threshold_db = -30.0;
            })
            .unwrap();
        engine.save_settings().unwrap();
        assert_eq!(engine.settings_path(), Some(path.as_path()));
    }

    let engine = PitchHopEngine::builder()
        .settings_path(&path)
        .preset(StabilityPreset::Responsive)
        .build()
        .unwrap();
    let settings = engine.settings();
    assert_eq!(settings.base_pitch_hz, 174.61);
    assert_eq!(settings.volume_threshold_db, -30.0);
    assert_eq!(settings.stability.threshold, 2);
}

#[test]
fn test_explicit_settings_win_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    Settings {
        base_pitch_hz: 300.0,
        ..Settings::default()
    }
    .save_to(&path)
    .unwrap();

    let engine = PitchHopEngine::builder()
        .settings(Settings::default())
        .settings_path(&path)
        .build()
        .unwrap();
    assert_eq!(engine.settings().base_pitch_hz, 130.81);
}

#[test]
fn test_invalid_settings_fail_build() {
    let result = PitchHopEngine::builder()
        .settings(Settings {
            min_frequency_hz: 500.0,
            max_frequency_hz: 100.0,
            ..Settings::default()
        })
        .build();
    assert!(result.is_err());
}
