//! Error types for display profile operations.

use thiserror::Error;

use crate::platform::{DispChange, SetConfigFlags, Win32Status};

/// Secondary stage of an apply that runs after the topology commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStage {
    Hdr,
    LegacySettings,
    TaskbarLayout,
    TaskbarSettings,
}

impl std::fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Hdr => "HDR sync",
            Self::LegacySettings => "legacy display settings sync",
            Self::TaskbarLayout => "taskbar layout restore",
            Self::TaskbarSettings => "taskbar settings restore",
        };
        f.write_str(name)
    }
}

/// Primary error type for display profile operations.
#[derive(Error, Debug)]
pub enum DprofError {
    // Native query errors
    #[error("Display topology changed twice while it was being read; aborting capture")]
    BufferRace,

    #[error("{step} failed with {status}")]
    NativeCall {
        step: &'static str,
        status: Win32Status,
    },

    #[error("Native display configuration is not available on this platform")]
    UnsupportedPlatform,

    // Identity reconciliation
    #[error("No display adapters are currently enumerated")]
    NoLiveAdapters,

    #[error("Saved adapter {handle:#x} ({device_path}) has no live counterpart")]
    IdentityMismatch { handle: u64, device_path: String },

    #[error("Snapshot '{name}' needs {} display(s) that are not connected", missing.len())]
    DisplaysMissing { name: String, missing: Vec<String> },

    // Apply errors
    #[error("Display configuration rejected at step '{step}' ({flags:?}): {status}")]
    ApplyRejected {
        step: &'static str,
        flags: SetConfigFlags,
        status: Win32Status,
    },

    #[error("Topology was applied but {stage} failed for {subject}: {reason}")]
    PartialApply {
        stage: ApplyStage,
        subject: String,
        reason: String,
    },

    // Storage errors
    #[error("Snapshot not found: {name}")]
    SnapshotNotFound { name: String },

    #[error("Snapshot store error: {0}")]
    Store(String),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl DprofError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SnapshotNotFound { .. }
                | Self::ConfigNotFound { .. }
                | Self::ConfigInvalid(_)
                | Self::IdentityMismatch { .. }
                | Self::DisplaysMissing { .. }
                | Self::BufferRace
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::BufferRace => Some("Wait for the displays to settle, then retry"),
            Self::SnapshotNotFound { .. } => Some("Run: dprof list"),
            Self::IdentityMismatch { .. } => {
                Some("Reconnect the missing adapter or set unmatched_adapter = \"first_live\"")
            }
            Self::DisplaysMissing { .. } => Some("Connect the listed displays, or use --force to try anyway"),
            Self::ApplyRejected { .. } => Some("Run: dprof check <NAME> to see which displays are missing"),
            Self::PartialApply { .. } => {
                Some("The new topology is active; re-run apply or adjust the remaining settings manually")
            }
            Self::UnsupportedPlatform => Some("dprof can only change displays on Windows"),
            _ => None,
        }
    }

    /// Build the partial-apply error for a rejected legacy mode change.
    pub fn legacy_rejected(device_key: &str, result: DispChange) -> Self {
        Self::PartialApply {
            stage: ApplyStage::LegacySettings,
            subject: device_key.to_string(),
            reason: result.to_string(),
        }
    }
}

/// Convenience type alias for Results using DprofError.
pub type Result<T> = std::result::Result<T, DprofError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| DprofError::Other(format!("{}: {e}", f().into())))
    }
}
