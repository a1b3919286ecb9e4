//! Target id repair for cloned topologies.

use dprof::snapshot::{MODE_IDX_INVALID, ModeKind, Snapshot};

use crate::common::fixtures::{NVIDIA, RADEON, cloned_trio, cross_adapter_clone, engine};

/// Make the second clone member claim the same target id as the first one,
/// as happens when a saved clone group outlives a connector renumbering.
fn with_duplicated_clone_target(mut saved: Snapshot) -> Snapshot {
    saved.paths[2].target.id = 200;
    if let Some(mode) = saved
        .modes
        .iter_mut()
        .find(|m| m.kind() == ModeKind::Target && m.id == 300)
    {
        mode.id = 200;
    }
    saved
}

fn target_mode_ids(snapshot: &Snapshot) -> Vec<u32> {
    snapshot
        .modes
        .iter()
        .filter(|m| m.kind() == ModeKind::Target)
        .map(|m| m.id)
        .collect()
}

#[test]
fn test_clone_group_is_detected() {
    let mut engine = engine(cloned_trio());
    let snap = engine.capture_active().unwrap();
    assert!(snap.is_cloned);
    assert_eq!(snap.clone_member_indices(), vec![1, 2]);
    // The second member of the group is reapplied without backing modes.
    assert_eq!(snap.paths[2].target.mode_info_idx, MODE_IDX_INVALID);
    assert_ne!(snap.paths[1].target.mode_info_idx, MODE_IDX_INVALID);
}

#[test]
fn test_intact_clone_group_needs_no_substitution() {
    let mut engine = engine(cloned_trio());
    let saved = engine.capture_active().unwrap();
    let working = engine.prepare(&saved).unwrap();
    assert!(working.clone_remap.is_empty());
    assert!(working.clone_remap.unresolved.is_empty());
}

#[test]
fn test_duplicated_clone_target_gets_free_live_id() {
    let mut engine = engine(cloned_trio());
    let saved = with_duplicated_clone_target(engine.capture_active().unwrap());

    let working = engine.prepare(&saved).unwrap();
    assert_eq!(working.clone_remap.substitutions.len(), 1);
    let sub = working.clone_remap.substitutions[0];
    assert_eq!((sub.path_index, sub.from, sub.to), (2, 200, 300));

    let ids: Vec<u32> = working.snapshot.paths.iter().map(|p| p.target.id).collect();
    assert_eq!(ids, vec![100, 200, 300]);
    assert_eq!(target_mode_ids(&working.snapshot), vec![100, 200, 300]);
}

#[test]
fn test_apply_commits_repaired_clone_targets() {
    let mut engine = engine(cloned_trio());
    let saved = with_duplicated_clone_target(engine.capture_active().unwrap());

    let report = engine.apply(&saved).unwrap();
    assert_eq!(report.clone_substitutions, 1);
    assert!(report.unresolved_clone_targets.is_empty());

    let live: Vec<u32> = engine
        .platform()
        .live_paths()
        .iter()
        .map(|p| p.target.id)
        .collect();
    assert_eq!(live, vec![100, 200, 300]);
    let refreshed = engine.last_captured().unwrap();
    assert_eq!(target_mode_ids(refreshed), vec![100, 200, 300]);
}

#[test]
fn test_independent_display_on_other_adapter_keeps_its_target() {
    let mut engine = engine(cross_adapter_clone());
    let mut saved = engine.capture_active().unwrap();
    assert!(saved.is_cloned);
    assert_eq!(saved.clone_member_indices(), vec![0, 1]);

    // Both clone members were saved with the Radeon display's connector id.
    for path in &mut saved.paths[..2] {
        path.target.id = 100;
    }
    for mode in &mut saved.modes {
        if mode.kind() == ModeKind::Target && mode.adapter_id == NVIDIA {
            mode.id = 100;
        }
    }

    let working = engine.prepare(&saved).unwrap();
    let subs = &working.clone_remap.substitutions;
    assert_eq!(subs.iter().map(|s| s.path_index).collect::<Vec<_>>(), vec![0, 1]);
    assert!(working.clone_remap.unresolved.is_empty());

    let paths = &working.snapshot.paths;
    assert_eq!(paths[2].target.id, 100);
    let mut member_ids = vec![paths[0].target.id, paths[1].target.id];
    member_ids.sort_unstable();
    assert_eq!(member_ids, vec![200, 300]);

    let mode_ids = |adapter| {
        let mut ids: Vec<u32> = working
            .snapshot
            .modes
            .iter()
            .filter(|m| m.kind() == ModeKind::Target && m.adapter_id == adapter)
            .map(|m| m.id)
            .collect();
        ids.sort_unstable();
        ids
    };
    assert_eq!(mode_ids(NVIDIA), vec![200, 300]);
    assert_eq!(mode_ids(RADEON), vec![100]);
}
