//! Capture tests against the mock platform.

use dprof::error::DprofError;
use dprof::platform::mock::{MockDisplay, MockPlatformBuilder};
use dprof::snapshot::{Component, Snapshot, diff, structurally_equal};

use crate::common::fixtures::{NVIDIA, NVIDIA_PATH, RADEON, engine, dual_gpu};
use crate::common::init_test_logging;

#[test]
fn test_capture_twice_is_structurally_equal() {
    init_test_logging();
    let mut engine = engine(dual_gpu());
    let first = engine.capture_active().unwrap();
    let second = engine.capture_active().unwrap();
    assert!(structurally_equal(&first, &second));
    assert_eq!(engine.last_captured(), Some(&second));
}

#[test]
fn test_json_round_trip_preserves_snapshot() {
    let mut engine = engine(dual_gpu());
    let snap = engine.capture_active().unwrap();
    let json = serde_json::to_string(&snap).unwrap();
    let back: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
    assert!(structurally_equal(&back, &snap));
}

#[test]
fn test_capture_contents() {
    let mut engine = engine(dual_gpu());
    let snap = engine.capture_active().unwrap();

    assert_eq!(snap.paths.len(), 2);
    assert_eq!(snap.adapters.len(), 2);
    assert!(!snap.is_cloned);
    assert_eq!(snap.fingerprints.len(), 2);
    assert!(snap.fingerprints.windows(2).all(|w| w[0] < w[1]));
    assert!(snap.fingerprints.iter().any(|f| f.ends_with("|LG OLED")));
    assert!(snap.fingerprints.iter().any(|f| f.contains(NVIDIA_PATH)));

    let hdr = snap
        .hdr_states
        .iter()
        .find(|h| h.adapter_id == RADEON)
        .unwrap();
    assert!(hdr.advanced_color.advanced_color_enabled);
    assert_eq!(snap.legacy_settings.len(), 2);
    assert_eq!(snap.taskbar_settings.get("TaskbarSmallIcons"), Some(0));
}

#[test]
fn test_handles_do_not_affect_equality() {
    let mut engine = engine(dual_gpu());
    let before = engine.capture_active().unwrap();
    engine
        .platform()
        .rehandle_adapters(&[(NVIDIA, dprof::snapshot::AdapterId(0x9001))]);
    let after = engine.capture_active().unwrap();

    assert_ne!(before.paths[0].target.adapter_id, after.paths[0].target.adapter_id);
    assert!(structurally_equal(&before, &after));
}

#[test]
fn test_hdr_change_is_a_structural_difference() {
    let mut engine = engine(dual_gpu());
    let before = engine.capture_active().unwrap();
    engine.platform().set_live_hdr(RADEON, 8448, false);
    let after = engine.capture_active().unwrap();
    assert_eq!(diff(&before, &after), vec![Component::HdrStates]);
}

#[test]
fn test_capture_all_includes_inactive_paths() {
    let mock = MockPlatformBuilder::new()
        .adapter(NVIDIA, NVIDIA_PATH)
        .display(MockDisplay::new(NVIDIA, 0, 1))
        .display(MockDisplay::new(NVIDIA, 1, 2).inactive())
        .build();
    let mut engine = engine(mock);

    let active = engine.capture_active().unwrap();
    let all = engine.capture_all().unwrap();
    assert_eq!(active.paths.len(), 1);
    assert_eq!(all.paths.len(), 2);
    assert_eq!(all.active_path_count(), 1);
    assert_eq!(engine.connected_fingerprints().unwrap().len(), 2);
    assert_eq!(engine.current_fingerprints().unwrap().len(), 1);
}

#[test]
fn test_single_buffer_race_is_retried() {
    let mut engine = engine(dual_gpu());
    engine.platform().race_buffers(1);
    assert!(engine.capture_active().is_ok());
}

#[test]
fn test_repeated_buffer_race_aborts_capture() {
    let mut engine = engine(dual_gpu());
    engine.platform().race_buffers(2);
    let err = engine.capture_active().unwrap_err();
    assert!(matches!(err, DprofError::BufferRace));
    assert!(err.is_user_recoverable());
    assert!(engine.last_captured().is_none());
}

#[test]
fn test_video_card_vendors() {
    let engine = engine(dual_gpu());
    assert_eq!(engine.video_card_vendors().unwrap(), vec!["10DE", "1002"]);
}
