//! Possibility, validity and activity checks.

use dprof::platform::mock::{MockDisplay, MockPlatformBuilder, Operation};
use dprof::platform::{SetConfigFlags, Win32Status};
use dprof::snapshot::AdapterId;

use crate::common::fixtures::{NVIDIA, NVIDIA_PATH, RADEON, RADEON_PATH, dual_gpu, engine};

#[test]
fn test_possible_when_every_display_is_connected() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    assert!(engine.is_possible(&saved).unwrap());
    assert!(engine.missing_displays(&saved).unwrap().is_empty());
}

#[test]
fn test_not_possible_when_a_display_is_unplugged() {
    let saved = engine(dual_gpu()).capture_active().unwrap();
    let live = MockPlatformBuilder::new()
        .adapter(NVIDIA, NVIDIA_PATH)
        .display(
            MockDisplay::new(NVIDIA, 0, 4353)
                .friendly_name("DELL U2720Q")
                .resolution(3840, 2160),
        )
        .build();
    let engine = engine(live);

    assert!(!engine.is_possible(&saved).unwrap());
    let missing = engine.missing_displays(&saved).unwrap();
    assert_eq!(missing.len(), 1);
    assert!(missing[0].ends_with("|LG OLED"));
}

#[test]
fn test_inactive_but_connected_display_is_possible() {
    let saved = engine(dual_gpu()).capture_active().unwrap();
    let live = MockPlatformBuilder::new()
        .adapter(NVIDIA, NVIDIA_PATH)
        .adapter(RADEON, RADEON_PATH)
        .display(
            MockDisplay::new(NVIDIA, 0, 4353)
                .gdi_name(r"\\.\DISPLAY1")
                .friendly_name("DELL U2720Q"),
        )
        .display(
            MockDisplay::new(RADEON, 0, 8448)
                .gdi_name(r"\\.\DISPLAY2")
                .friendly_name("LG OLED")
                .inactive(),
        )
        .build();
    assert!(engine(live).is_possible(&saved).unwrap());
}

#[test]
fn test_valid_submits_validate_only_request() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().clear_operations();

    assert!(engine.is_valid(&saved).unwrap());
    let calls = engine.platform().set_config_calls();
    assert_eq!(calls, vec![SetConfigFlags::VALIDATE_SUPPLIED]);
    assert!(!calls[0].contains(SetConfigFlags::APPLY));
}

#[test]
fn test_rejected_validation_is_invalid() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine
        .platform()
        .queue_set_config_results([Win32Status::BAD_CONFIGURATION]);
    assert!(!engine.is_valid(&saved).unwrap());
}

#[test]
fn test_missing_adapter_is_invalid_without_asking_the_os() {
    let saved = engine(dual_gpu()).capture_active().unwrap();
    let live = MockPlatformBuilder::new()
        .adapter(AdapterId(0x42), NVIDIA_PATH)
        .display(MockDisplay::new(AdapterId(0x42), 0, 4353))
        .build();
    let engine = engine(live);

    assert!(!engine.is_valid(&saved).unwrap());
    assert_eq!(
        engine
            .platform()
            .count(|op| matches!(op, Operation::SetConfig { .. })),
        0
    );
}

#[test]
fn test_active_tracks_live_changes() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    assert!(engine.is_active(&saved).unwrap());

    engine.platform().set_live_hdr(RADEON, 8448, false);
    assert!(!engine.is_active(&saved).unwrap());
}
