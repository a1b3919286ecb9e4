//! Applying snapshots: the commit ladder and the secondary stages.

use dprof::engine::APPLY_LADDER;
use dprof::error::{ApplyStage, DprofError};
use dprof::platform::mock::{MockCall, Operation};
use dprof::platform::{DispChange, SetConfigFlags, Win32Status};
use dprof::snapshot::{MAIN_SCREEN_PATH, TaskbarEdge, structurally_equal};

use crate::common::fixtures::{
    NVIDIA, RADEON, dual_gpu, engine, single_with_taskbar_version,
};
use crate::common::init_test_logging;

#[test]
fn test_apply_unchanged_commits_on_first_step() {
    init_test_logging();
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().clear_operations();

    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.step, APPLY_LADDER[0].name);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.hdr_changes, 0);
    assert_eq!(report.legacy_settings_applied, 2);
    assert!(!report.taskbar_settings_applied);

    let calls = engine.platform().set_config_calls();
    assert_eq!(calls, vec![APPLY_LADDER[0].flags]);
    assert!(calls[0].contains(SetConfigFlags::FORCE_MODE_ENUMERATION));
    engine.platform().assert_contains(&Operation::RefreshTrayArea);
    assert!(structurally_equal(engine.last_captured().unwrap(), &saved));
}

#[test]
fn test_invalid_parameter_escalates_to_next_step() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().clear_operations();
    engine
        .platform()
        .queue_set_config_results([Win32Status::INVALID_PARAMETER]);

    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.attempts, 2);
    assert_eq!(report.step, APPLY_LADDER[1].name);
    assert_eq!(
        engine.platform().set_config_calls(),
        vec![APPLY_LADDER[0].flags, APPLY_LADDER[1].flags]
    );
}

#[test]
fn test_topology_only_is_the_last_resort() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().queue_set_config_results([
        Win32Status::INVALID_PARAMETER,
        Win32Status::INVALID_PARAMETER,
    ]);

    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.attempts, 3);
    assert!(APPLY_LADDER[2].flags.contains(SetConfigFlags::TOPOLOGY_SUPPLIED));
}

#[test]
fn test_every_step_rejected() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine
        .platform()
        .queue_set_config_results([Win32Status::INVALID_PARAMETER; 3]);

    let err = engine.apply(&saved).unwrap_err();
    match err {
        DprofError::ApplyRejected { step, status, .. } => {
            assert_eq!(step, APPLY_LADDER[2].name);
            assert_eq!(status, Win32Status::INVALID_PARAMETER);
        }
        other => panic!("expected ApplyRejected, got {other:?}"),
    }
}

#[test]
fn test_other_rejection_stops_after_one_attempt() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().clear_operations();
    engine
        .platform()
        .queue_set_config_results([Win32Status::NOT_SUPPORTED]);

    let err = engine.apply(&saved).unwrap_err();
    assert!(matches!(
        err,
        DprofError::ApplyRejected {
            status: Win32Status::NOT_SUPPORTED,
            ..
        }
    ));
    assert_eq!(engine.platform().set_config_calls().len(), 1);
    assert_eq!(
        engine
            .platform()
            .count(|op| matches!(op, Operation::SetAdvancedColor { .. })),
        0
    );
}

#[test]
fn test_hdr_sync_is_idempotent() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().set_live_hdr(RADEON, 8448, false);
    engine.platform().clear_operations();

    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.hdr_changes, 1);
    engine.platform().assert_contains(&Operation::SetAdvancedColor {
        adapter_id: RADEON,
        target_id: 8448,
        enable: true,
    });
    assert_eq!(engine.platform().live_hdr(RADEON, 8448), Some(true));

    engine.platform().clear_operations();
    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.hdr_changes, 0);
    assert_eq!(
        engine
            .platform()
            .count(|op| matches!(op, Operation::SetAdvancedColor { .. })),
        0
    );
}

#[test]
fn test_hdr_failure_is_partial_apply() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().set_live_hdr(RADEON, 8448, false);
    engine
        .platform()
        .fail(MockCall::SetAdvancedColor, Win32Status::GEN_FAILURE);

    let err = engine.apply(&saved).unwrap_err();
    assert!(matches!(
        err,
        DprofError::PartialApply {
            stage: ApplyStage::Hdr,
            ..
        }
    ));
    // The topology commit itself went through.
    assert_eq!(engine.platform().set_config_calls().len(), 1);
}

#[test]
fn test_legacy_settings_overlay_saved_refresh_rate() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    let mut drifted = engine.platform().live_device_mode(r"\\.\DISPLAY2").unwrap();
    drifted.frequency = 60;
    drifted.bits_per_pixel = 16;
    engine
        .platform()
        .set_live_device_mode(r"\\.\DISPLAY2", drifted);

    engine.apply(&saved).unwrap();
    let restored = engine.platform().live_device_mode(r"\\.\DISPLAY2").unwrap();
    assert_eq!(restored.frequency, 120);
    assert_eq!(restored.bits_per_pixel, 32);
}

#[test]
fn test_legacy_rejection_is_partial_apply() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine
        .platform()
        .device_mode_result(r"\\.\DISPLAY1", DispChange::BadMode);

    let err = engine.apply(&saved).unwrap_err();
    match err {
        DprofError::PartialApply { stage, reason, .. } => {
            assert_eq!(stage, ApplyStage::LegacySettings);
            assert!(!reason.is_empty());
        }
        other => panic!("expected PartialApply, got {other:?}"),
    }
    assert_eq!(
        engine
            .platform()
            .count(|op| matches!(op, Operation::WriteStuckRect { .. })),
        0
    );
}

#[test]
fn test_taskbar_layout_restored() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().clear_operations();

    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.taskbar_records_written, saved.taskbar_layout.len());
    assert_eq!(report.taskbar_records_skipped, 0);
    engine.platform().assert_contains(&Operation::WriteStuckRect {
        device_path: MAIN_SCREEN_PATH.to_string(),
        version: 3,
    });
    engine
        .platform()
        .assert_contains(&Operation::RepositionMainTaskbar {
            edge: TaskbarEdge::Bottom,
        });
    engine
        .platform()
        .assert_contains(&Operation::RepositionSecondaryTaskbars);
}

#[test]
fn test_unknown_taskbar_version_is_skipped() {
    let mut engine = engine(single_with_taskbar_version(4));
    let saved = engine.capture_active().unwrap();
    assert!(saved.taskbar_layout.iter().all(|r| r.version == 4));
    engine.platform().clear_operations();

    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.taskbar_records_written, 0);
    assert_eq!(report.taskbar_records_skipped, saved.taskbar_layout.len());
    assert_eq!(
        engine
            .platform()
            .count(|op| matches!(op, Operation::WriteStuckRect { .. })),
        0
    );
    assert_eq!(
        engine
            .platform()
            .count(|op| matches!(op, Operation::RepositionMainTaskbar { .. })),
        0
    );
}

#[test]
fn test_taskbar_settings_restored_only_when_different() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();

    engine.platform().clear_operations();
    assert!(!engine.apply(&saved).unwrap().taskbar_settings_applied);
    assert_eq!(
        engine
            .platform()
            .count(|op| matches!(op, Operation::ApplyTaskbarSettings)),
        0
    );

    engine
        .platform()
        .set_live_taskbar_option("TaskbarSmallIcons", 1);
    let report = engine.apply(&saved).unwrap();
    assert!(report.taskbar_settings_applied);
    let live = engine.capture_active().unwrap();
    assert_eq!(live.taskbar_settings.get("TaskbarSmallIcons"), Some(0));
}

#[test]
fn test_apply_after_rehandle_uses_live_handles() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    let fresh = dprof::snapshot::AdapterId(0x7777);
    engine.platform().rehandle_adapters(&[(NVIDIA, fresh)]);

    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.adapter_fallbacks, 0);
    assert!(
        engine
            .platform()
            .live_paths()
            .iter()
            .all(|p| p.target.adapter_id == fresh || p.target.adapter_id == RADEON)
    );
}
