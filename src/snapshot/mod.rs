//! Display snapshots: the captured topology, its comparison rules and its
//! persistent store.
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/dprof/
//! └── snapshots.db    # SQLite database, one JSON body per named snapshot
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dprof::snapshot::{SnapshotDb, structurally_equal};
//!
//! let mut db = SnapshotDb::open_default()?;
//! db.save_snapshot("desk", Some("three screens"), &captured)?;
//!
//! let stored = db.require_snapshot("desk")?;
//! if !structurally_equal(&stored.snapshot, &live) {
//!     // reapply...
//! }
//! ```

mod compare;
mod db;
pub mod fingerprint;
mod schema;
mod taskbar;

pub use compare::{
    Component, diff, hdr_eq, legacy_setting_eq, mode_eq, path_eq, structurally_equal,
};
pub use db::{ExportedSnapshot, SnapshotDb, SnapshotSummary, StoredSnapshot, default_db_path};
pub use schema::{
    AdapterEntry, AdapterId, AdapterTable, AdvancedColorInfo, DesktopImageInfo, DeviceInfoHeader,
    DisplayMode, DisplayPath, HdrState, LegacyDeviceMode, LegacyDisplaySetting, MODE_IDX_INVALID,
    ModeInfo, ModeKind, OutputTechnology, PATH_ACTIVE, PathSource, PathTarget, Point, Rational,
    Rect, SdrWhiteLevel, Size2D, Snapshot, SourceMode, VideoSignalInfo,
};
pub use taskbar::{
    MAIN_SCREEN_PATH, StuckRect, TASKBAR_OPTIONS, TaskbarEdge, TaskbarLayoutRecord,
    TaskbarSettings,
};
