//! Snapshot store tests with captured snapshots.

use dprof::error::DprofError;
use dprof::snapshot::{SnapshotDb, structurally_equal};
use tempfile::TempDir;

use crate::common::fixtures::{cloned_trio, dual_gpu, engine};

#[test]
fn test_saved_snapshot_reapplies_after_reload() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("snapshots.db");

    let mut engine = engine(dual_gpu());
    let captured = engine.capture_active().unwrap();
    {
        let mut db = SnapshotDb::open(&db_path).unwrap();
        db.save_snapshot("desk", Some("two GPUs"), &captured).unwrap();
    }

    let db = SnapshotDb::open(&db_path).unwrap();
    let stored = db.require_snapshot("desk").unwrap();
    assert_eq!(stored.description.as_deref(), Some("two GPUs"));
    assert_eq!(stored.snapshot, captured);
    assert!(engine.is_active(&stored.snapshot).unwrap());
    assert!(engine.apply(&stored.snapshot).is_ok());
}

#[test]
fn test_list_reports_layout_summary() {
    let mut db = SnapshotDb::in_memory().unwrap();
    let desk = engine(dual_gpu()).capture_active().unwrap();
    let stage = engine(cloned_trio()).capture_active().unwrap();
    db.save_snapshot("desk", None, &desk).unwrap();
    db.save_snapshot("stage", None, &stage).unwrap();

    let list = db.list_snapshots().unwrap();
    assert_eq!(list.len(), 2);
    let stage_row = list.iter().find(|s| s.name == "stage").unwrap();
    assert!(stage_row.is_cloned);
    assert_eq!(stage_row.active_paths, 3);
    let desk_row = list.iter().find(|s| s.name == "desk").unwrap();
    assert!(!desk_row.is_cloned);
    assert_eq!(desk_row.display_count, 2);
}

#[test]
fn test_export_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("desk.json");
    let captured = engine(dual_gpu()).capture_active().unwrap();

    let mut source = SnapshotDb::in_memory().unwrap();
    source.save_snapshot("desk", Some("home"), &captured).unwrap();
    source.export_json("desk", &file).unwrap();

    let mut target = SnapshotDb::in_memory().unwrap();
    let name = target.import_json(&file, Some("desk-copy")).unwrap();
    assert_eq!(name, "desk-copy");
    let stored = target.require_snapshot("desk-copy").unwrap();
    assert!(structurally_equal(&stored.snapshot, &captured));
    assert_eq!(stored.description.as_deref(), Some("home"));
}

#[test]
fn test_bare_snapshot_import_needs_a_name() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bare.json");
    let captured = engine(dual_gpu()).capture_active().unwrap();
    std::fs::write(&file, serde_json::to_string(&captured).unwrap()).unwrap();

    let mut db = SnapshotDb::in_memory().unwrap();
    assert!(db.import_json(&file, None).is_err());
    assert_eq!(db.import_json(&file, Some("bare")).unwrap(), "bare");
}

#[test]
fn test_delete_and_missing() {
    let mut db = SnapshotDb::in_memory().unwrap();
    let captured = engine(dual_gpu()).capture_active().unwrap();
    db.save_snapshot("desk", None, &captured).unwrap();

    assert!(db.delete_snapshot("desk").unwrap());
    assert!(!db.delete_snapshot("desk").unwrap());
    assert!(matches!(
        db.require_snapshot("desk").unwrap_err(),
        DprofError::SnapshotNotFound { .. }
    ));
}
