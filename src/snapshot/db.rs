//! SQLite storage for named display snapshots.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::schema::Snapshot;
use crate::error::{DprofError, Result};

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    display_count INTEGER NOT NULL,
    active_paths INTEGER NOT NULL,
    is_cloned INTEGER NOT NULL,
    snapshot_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_snapshots_updated ON snapshots(updated_at);
";

/// A snapshot together with its store metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

/// Listing row; the snapshot body is not decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub display_count: u32,
    pub active_paths: u32,
    pub is_cloned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File format of `dprof export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedSnapshot {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub exported_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Exported(Box<ExportedSnapshot>),
    Bare(Box<Snapshot>),
}

fn store_err(what: &str) -> impl FnOnce(rusqlite::Error) -> DprofError + '_ {
    move |e| DprofError::Store(format!("{what}: {e}"))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DprofError::Store(format!("Invalid timestamp '{raw}': {e}")))
}

/// Database wrapper for snapshot storage.
pub struct SnapshotDb {
    conn: Connection,
}

impl SnapshotDb {
    /// Opens or creates a database at the standard location.
    ///
    /// Location: `<data dir>/dprof/snapshots.db`
    #[instrument]
    pub fn open_default() -> Result<Self> {
        let path = default_db_path()?;
        Self::open(&path)
    }

    /// Opens or creates a database at the given path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DprofError::Store(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        debug!(path = %path.display(), "Opening snapshot database");
        let conn = Connection::open(path).map_err(store_err("Failed to open database"))?;

        let db = Self { conn };
        db.init_schema()?;
        info!(path = %path.display(), "Snapshot database ready");
        Ok(db)
    }

    /// Creates an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(store_err("Failed to create in-memory database"))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(store_err("Failed to initialize schema"))
    }

    /// Saves a snapshot under `name`, replacing the body of an existing entry.
    ///
    /// The creation timestamp of an existing entry is kept.
    #[instrument(skip(self, description, snapshot))]
    pub fn save_snapshot(
        &mut self,
        name: &str,
        description: Option<&str>,
        snapshot: &Snapshot,
    ) -> Result<i64> {
        let body = serde_json::to_string(snapshot)?;
        let now = Utc::now().to_rfc3339();
        let display_count = u32::try_from(snapshot.fingerprints.len()).unwrap_or(u32::MAX);
        let active_paths = u32::try_from(snapshot.active_path_count()).unwrap_or(u32::MAX);

        let tx = self
            .conn
            .transaction()
            .map_err(store_err("Failed to start transaction"))?;

        let existing_id: Option<i64> = tx
            .query_row(
                "SELECT id FROM snapshots WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err("Failed to look up snapshot"))?;

        let id = if let Some(id) = existing_id {
            debug!(id, "Updating existing snapshot");
            tx.execute(
                "UPDATE snapshots SET
                    description = ?1,
                    display_count = ?2,
                    active_paths = ?3,
                    is_cloned = ?4,
                    snapshot_json = ?5,
                    updated_at = ?6
                 WHERE id = ?7",
                params![
                    description,
                    display_count,
                    active_paths,
                    snapshot.is_cloned,
                    body,
                    now,
                    id
                ],
            )
            .map_err(store_err("Failed to update snapshot"))?;
            id
        } else {
            debug!("Inserting new snapshot");
            tx.execute(
                "INSERT INTO snapshots (name, description, display_count, active_paths, is_cloned, snapshot_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    name,
                    description,
                    display_count,
                    active_paths,
                    snapshot.is_cloned,
                    body,
                    now,
                    now
                ],
            )
            .map_err(store_err("Failed to insert snapshot"))?;
            tx.last_insert_rowid()
        };

        tx.commit().map_err(store_err("Failed to commit transaction"))?;
        info!(name, id, displays = display_count, "Snapshot saved");
        Ok(id)
    }

    /// Loads a snapshot by name.
    #[instrument(skip(self))]
    pub fn load_snapshot(&self, name: &str) -> Result<Option<StoredSnapshot>> {
        let row: Option<(i64, String, Option<String>, String, String, String)> = self
            .conn
            .query_row(
                "SELECT id, name, description, snapshot_json, created_at, updated_at
                 FROM snapshots WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()
            .map_err(store_err("Failed to load snapshot"))?;

        let Some((id, name, description, body, created_at, updated_at)) = row else {
            debug!(name, "Snapshot not found");
            return Ok(None);
        };

        let snapshot: Snapshot = serde_json::from_str(&body)?;
        debug!(name = %name, paths = snapshot.paths.len(), "Snapshot loaded");
        Ok(Some(StoredSnapshot {
            id: Some(id),
            name,
            description,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            snapshot,
        }))
    }

    /// Loads a snapshot by name, failing when it does not exist.
    pub fn require_snapshot(&self, name: &str) -> Result<StoredSnapshot> {
        self.load_snapshot(name)?
            .ok_or_else(|| DprofError::SnapshotNotFound {
                name: name.to_string(),
            })
    }

    /// Lists all snapshots, most recently updated first.
    #[instrument(skip(self))]
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, display_count, active_paths, is_cloned, created_at, updated_at
                 FROM snapshots ORDER BY updated_at DESC, name ASC",
            )
            .map_err(store_err("Failed to prepare statement"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .map_err(store_err("Failed to query snapshots"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err("Failed to collect snapshots"))?;

        let summaries = rows
            .into_iter()
            .map(
                |(id, name, description, display_count, active_paths, is_cloned, created, updated)| {
                    Ok(SnapshotSummary {
                        id,
                        name,
                        description,
                        display_count,
                        active_paths,
                        is_cloned,
                        created_at: parse_timestamp(&created)?,
                        updated_at: parse_timestamp(&updated)?,
                    })
                },
            )
            .collect::<Result<Vec<_>>>()?;

        debug!(count = summaries.len(), "Listed snapshots");
        Ok(summaries)
    }

    /// Deletes a snapshot by name.
    ///
    /// Returns true if a snapshot was deleted, false if not found.
    #[instrument(skip(self))]
    pub fn delete_snapshot(&mut self, name: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM snapshots WHERE name = ?1", params![name])
            .map_err(store_err("Failed to delete snapshot"))?;

        if deleted > 0 {
            info!(name, "Snapshot deleted");
            Ok(true)
        } else {
            debug!(name, "Snapshot not found for deletion");
            Ok(false)
        }
    }

    #[instrument(skip(self))]
    pub fn snapshot_exists(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM snapshots WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err("Failed to look up snapshot"))?;
        Ok(found.is_some())
    }

    /// Writes one stored snapshot to a JSON file.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn export_json<P: AsRef<Path>>(&self, name: &str, path: P) -> Result<()> {
        let stored = self.require_snapshot(name)?;
        let export = ExportedSnapshot {
            name: stored.name,
            description: stored.description,
            exported_at: Utc::now(),
            snapshot: stored.snapshot,
        };
        let json = serde_json::to_string_pretty(&export)?;
        std::fs::write(path.as_ref(), json)?;
        info!(name, "Snapshot exported");
        Ok(())
    }

    /// Reads a JSON file written by [`export_json`](Self::export_json), or a
    /// bare snapshot, and stores it.
    ///
    /// A bare snapshot needs `name_override`. Returns the stored name.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn import_json<P: AsRef<Path>>(
        &mut self,
        path: P,
        name_override: Option<&str>,
    ) -> Result<String> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let (name, description, snapshot) = match serde_json::from_str::<ImportFile>(&raw)? {
            ImportFile::Exported(export) => {
                let export = *export;
                let name = name_override.map_or(export.name, str::to_string);
                (name, export.description, export.snapshot)
            }
            ImportFile::Bare(snapshot) => {
                let name = name_override.ok_or_else(|| {
                    DprofError::Other(
                        "The file holds a bare snapshot; pass --name to store it".to_string(),
                    )
                })?;
                (name.to_string(), None, *snapshot)
            }
        };
        self.save_snapshot(&name, description.as_deref(), &snapshot)?;
        Ok(name)
    }
}

/// Returns the default database path.
///
/// Location: `<data dir>/dprof/snapshots.db`
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir().ok_or_else(|| {
        DprofError::Other("Could not determine local data directory".to_string())
    })?;
    Ok(data_dir.join("dprof").join("snapshots.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::DisplayPath;

    fn sample() -> Snapshot {
        let mut snap = Snapshot::new();
        let mut path = DisplayPath::default();
        path.flags = crate::snapshot::PATH_ACTIVE;
        snap.paths.push(path);
        snap.fingerprints.push("WINAPI|a|b|c|d|e|f".to_string());
        snap
    }

    #[test]
    fn test_create_database() {
        let db = SnapshotDb::in_memory().unwrap();
        assert!(db.list_snapshots().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let mut db = SnapshotDb::in_memory().unwrap();
        let id = db.save_snapshot("desk", Some("three screens"), &sample()).unwrap();
        assert!(id > 0);

        let loaded = db.load_snapshot("desk").unwrap().unwrap();
        assert_eq!(loaded.name, "desk");
        assert_eq!(loaded.description.as_deref(), Some("three screens"));
        assert_eq!(loaded.snapshot, sample());
    }

    #[test]
    fn test_update_keeps_single_row() {
        let mut db = SnapshotDb::in_memory().unwrap();
        db.save_snapshot("desk", None, &Snapshot::new()).unwrap();
        db.save_snapshot("desk", None, &sample()).unwrap();

        let list = db.list_snapshots().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].display_count, 1);
        assert_eq!(list[0].active_paths, 1);
        assert_eq!(db.load_snapshot("desk").unwrap().unwrap().snapshot, sample());
    }

    #[test]
    fn test_delete_snapshot() {
        let mut db = SnapshotDb::in_memory().unwrap();
        db.save_snapshot("gone", None, &sample()).unwrap();
        assert!(db.snapshot_exists("gone").unwrap());

        assert!(db.delete_snapshot("gone").unwrap());
        assert!(!db.snapshot_exists("gone").unwrap());
        assert!(!db.delete_snapshot("gone").unwrap());
    }

    #[test]
    fn test_require_missing_snapshot() {
        let db = SnapshotDb::in_memory().unwrap();
        let err = db.require_snapshot("nope").unwrap_err();
        assert!(matches!(err, DprofError::SnapshotNotFound { .. }));
    }

    #[test]
    fn test_export_import_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("desk.json");

        let mut db = SnapshotDb::in_memory().unwrap();
        db.save_snapshot("desk", Some("home"), &sample()).unwrap();
        db.export_json("desk", &file).unwrap();

        let mut other = SnapshotDb::in_memory().unwrap();
        let name = other.import_json(&file, None).unwrap();
        assert_eq!(name, "desk");
        let loaded = other.load_snapshot("desk").unwrap().unwrap();
        assert_eq!(loaded.description.as_deref(), Some("home"));
        assert_eq!(loaded.snapshot, sample());
    }

    #[test]
    fn test_import_bare_snapshot_requires_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bare.json");
        std::fs::write(&file, serde_json::to_string(&sample()).unwrap()).unwrap();

        let mut db = SnapshotDb::in_memory().unwrap();
        assert!(db.import_json(&file, None).is_err());
        assert_eq!(db.import_json(&file, Some("bare")).unwrap(), "bare");
    }

    #[test]
    fn test_default_db_path() {
        if let Ok(path) = default_db_path() {
            assert!(path.ends_with("dprof/snapshots.db"));
        }
    }
}
