//! Adapter reconciliation after the OS hands out new adapter handles.

use dprof::engine::DisplayEngine;
use dprof::error::DprofError;
use dprof::platform::mock::{MockDisplay, MockPlatformBuilder};
use dprof::snapshot::AdapterId;

use crate::common::fixtures::{
    NVIDIA, NVIDIA_PATH, RADEON, RADEON_PATH, dual_gpu, engine, refusing_config,
};

const NVIDIA_AFTER_REBOOT: AdapterId = AdapterId(0x0000_0001_0001_0a4e);
const RADEON_AFTER_REBOOT: AdapterId = AdapterId(0x0000_0001_0001_0b9f);

#[test]
fn test_saved_handles_map_to_live_handles_by_device_path() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    engine.platform().rehandle_adapters(&[
        (NVIDIA, NVIDIA_AFTER_REBOOT),
        (RADEON, RADEON_AFTER_REBOOT),
    ]);

    let working = engine.prepare(&saved).unwrap();
    assert_eq!(working.adapter_remap.get(NVIDIA), Some(NVIDIA_AFTER_REBOOT));
    assert_eq!(working.adapter_remap.get(RADEON), Some(RADEON_AFTER_REBOOT));
    assert!(working.adapter_remap.fallbacks().is_empty());

    let patched = &working.snapshot;
    let live = [NVIDIA_AFTER_REBOOT, RADEON_AFTER_REBOOT];
    assert!(patched.paths.iter().all(|p| live.contains(&p.source.adapter_id)
        && live.contains(&p.target.adapter_id)));
    assert!(patched.modes.iter().all(|m| live.contains(&m.adapter_id)));
    assert!(patched.hdr_states.iter().all(|h| h.is_consistent() && live.contains(&h.adapter_id)));
    assert_eq!(
        patched.adapters.device_path(RADEON_AFTER_REBOOT),
        Some(RADEON_PATH)
    );

    // The saved snapshot is never modified.
    assert!(saved.paths.iter().all(|p| p.target.adapter_id == NVIDIA || p.target.adapter_id == RADEON));
}

#[test]
fn test_unchanged_handles_give_identity_remap() {
    let mut engine = engine(dual_gpu());
    let saved = engine.capture_active().unwrap();
    let working = engine.prepare(&saved).unwrap();
    assert!(working.adapter_remap.is_identity());
    assert_eq!(working.snapshot, saved);
}

fn nvidia_only() -> dprof::platform::mock::MockPlatform {
    MockPlatformBuilder::new()
        .adapter(NVIDIA_AFTER_REBOOT, NVIDIA_PATH)
        .display(MockDisplay::new(NVIDIA_AFTER_REBOOT, 0, 4353).resolution(3840, 2160))
        .build()
}

#[test]
fn test_missing_adapter_falls_back_to_first_live() {
    let saved = engine(dual_gpu()).capture_active().unwrap();
    let engine = engine(nvidia_only());

    let working = engine.prepare(&saved).unwrap();
    assert_eq!(working.adapter_remap.get(RADEON), Some(NVIDIA_AFTER_REBOOT));
    assert_eq!(working.adapter_remap.fallbacks(), &[RADEON]);
    assert!(
        working
            .snapshot
            .paths
            .iter()
            .all(|p| p.target.adapter_id == NVIDIA_AFTER_REBOOT)
    );
}

#[test]
fn test_missing_adapter_refused_when_configured() {
    let saved = engine(dual_gpu()).capture_active().unwrap();
    let engine = DisplayEngine::new(nvidia_only(), refusing_config());

    let err = engine.prepare(&saved).unwrap_err();
    match err {
        DprofError::IdentityMismatch {
            handle,
            device_path,
        } => {
            assert_eq!(handle, RADEON.0);
            assert_eq!(device_path, RADEON_PATH);
        }
        other => panic!("expected IdentityMismatch, got {other:?}"),
    }
}

#[test]
fn test_no_live_adapters() {
    let saved = engine(dual_gpu()).capture_active().unwrap();
    let engine = engine(MockPlatformBuilder::new().build());
    assert!(matches!(
        engine.prepare(&saved).unwrap_err(),
        DprofError::NoLiveAdapters
    ));
}
