//! Output mode abstraction for robot and human output.

use std::path::Path;

use serde::Serialize;

use crate::cli::Cli;
use crate::config::EngineConfig;
use crate::engine::ApplyReport;
use crate::error::DprofError;
use crate::report::SnapshotReport;
use crate::snapshot::{Component, Snapshot, SnapshotSummary};

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

// === Check Result Types ===

/// Outcome of `dprof check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    /// Every saved display is connected.
    pub possible: bool,
    /// The OS accepts the reconciled topology; only evaluated when possible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    /// The snapshot is the live configuration already.
    pub active: bool,
    pub missing_displays: Vec<String>,
}

impl CheckResult {
    /// True when an apply is expected to succeed.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        self.possible && self.valid.unwrap_or(false)
    }
}

/// Outcome of `dprof diff`.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub first: String,
    pub second: String,
    pub identical: bool,
    pub differing: Vec<Component>,
}

impl DiffResult {
    #[must_use]
    pub fn new(first: impl Into<String>, second: impl Into<String>, differing: Vec<Component>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            identical: differing.is_empty(),
            differing,
        }
    }
}

/// Robot output format.
#[derive(Debug, Clone, Copy)]
pub enum RobotFormat {
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    JsonCompact,
}

/// Output mode selection.
#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    /// JSON for scripts and agents.
    Robot(RobotFormat),
    /// Styled text; the flag disables color.
    Human { no_color: bool },
}

impl OutputMode {
    /// Determine output mode from CLI flags.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            Self::Human {
                no_color: cli.no_color,
            }
        }
    }

    #[must_use]
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    /// Create the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { no_color } => Box::new(HumanOutput::new(no_color)),
        }
    }
}

/// Output abstraction for dual-mode (human/robot) output.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &DprofError);
    fn warning(&self, message: &str);
    fn info(&self, message: &str);

    // Snapshots
    fn captured(&self, snapshot: &Snapshot, report: &SnapshotReport, saved_as: Option<&str>);
    fn snapshot_list(&self, snapshots: &[SnapshotSummary]);
    fn snapshot_report(&self, title: &str, report: &SnapshotReport);
    fn diff_result(&self, result: &DiffResult);

    // Apply
    fn check_result(&self, result: &CheckResult);
    fn already_active(&self, name: &str);
    fn apply_report(&self, name: &str, report: &ApplyReport);

    // Hardware
    fn vendors(&self, vendors: &[String]);

    // Configuration
    fn config_path(&self, path: &Path, exists: bool);
    fn config(&self, config: &EngineConfig);

    // Metadata
    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_mode_from_cli() {
        let cli = Cli::try_parse_from(["dprof", "--format", "json-compact", "list"]).unwrap();
        assert!(matches!(
            OutputMode::from_cli(&cli),
            OutputMode::Robot(RobotFormat::JsonCompact)
        ));

        let cli = Cli::try_parse_from(["dprof", "--no-color", "list"]).unwrap();
        let mode = OutputMode::from_cli(&cli);
        assert!(!mode.is_robot());
        assert!(matches!(mode, OutputMode::Human { no_color: true }));
    }

    #[test]
    fn test_check_result_applicable() {
        let mut result = CheckResult {
            name: "desk".to_string(),
            possible: true,
            valid: Some(true),
            active: false,
            missing_displays: Vec::new(),
        };
        assert!(result.is_applicable());
        result.valid = None;
        assert!(!result.is_applicable());
    }

    #[test]
    fn test_diff_result_identical_flag() {
        assert!(DiffResult::new("a", "b", Vec::new()).identical);
        let result = DiffResult::new("a", "live", vec![Component::HdrStates]);
        assert!(!result.identical);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["differing"][0], "hdr_states");
    }
}
