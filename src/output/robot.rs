//! Robot mode JSON output implementation.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::config::EngineConfig;
use crate::engine::ApplyReport;
use crate::error::DprofError;
use crate::report::SnapshotReport;
use crate::snapshot::{Snapshot, SnapshotSummary};

use super::{CheckResult, DiffResult, Output, RobotFormat};

/// JSON output implementation for AI agents and scripting.
///
/// Results go to stdout, errors to stderr.
pub struct RobotOutput {
    format: RobotFormat,
}

fn serialization_failure(e: &serde_json::Error) -> String {
    serde_json::json!({
        "error": true,
        "message": format!("serialization failed: {e}"),
    })
    .to_string()
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    fn render<T: Serialize + ?Sized>(&self, data: &T) -> String {
        let rendered = match self.format {
            RobotFormat::Json => {
                trace!("Serializing as pretty JSON");
                serde_json::to_string_pretty(data)
            }
            RobotFormat::JsonCompact => {
                trace!("Serializing as compact JSON");
                serde_json::to_string(data)
            }
        };
        rendered.unwrap_or_else(|e| serialization_failure(&e))
    }

    /// Output any serializable data as JSON to stdout.
    #[instrument(skip(self, data), fields(format = ?self.format))]
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        let json = self.render(data);
        trace!(json_len = json.len(), "JSON serialized");
        println!("{json}");
    }

    /// Output pretty JSON to stderr.
    #[instrument(skip(self, data))]
    fn output_json_pretty_stderr<T: Serialize>(&self, data: &T) {
        let json = serde_json::to_string_pretty(data).unwrap_or_else(|e| serialization_failure(&e));
        trace!(json_len = json.len(), "JSON error serialized");
        eprintln!("{json}");
    }
}

impl Output for RobotOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        debug!(message, "Robot: success");
        self.output_json(&serde_json::json!({
            "success": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &DprofError) {
        debug!(error = %error, "Robot: error");
        let mut body = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        if let DprofError::DisplaysMissing { missing, .. } = error {
            body["missing_displays"] = serde_json::json!(missing);
        }
        self.output_json_pretty_stderr(&body);
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        debug!(message, "Robot: warning");
        self.output_json_pretty_stderr(&serde_json::json!({
            "warning": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        debug!(message, "Robot: info");
        self.output_json(&serde_json::json!({
            "info": true,
            "message": message
        }));
    }

    #[instrument(skip_all)]
    fn captured(&self, snapshot: &Snapshot, _report: &SnapshotReport, saved_as: Option<&str>) {
        debug!(?saved_as, "Robot: captured");
        self.output_json(&serde_json::json!({
            "saved_as": saved_as,
            "snapshot": snapshot,
        }));
    }

    #[instrument(skip_all, fields(count = snapshots.len()))]
    fn snapshot_list(&self, snapshots: &[SnapshotSummary]) {
        self.output_json(snapshots);
    }

    #[instrument(skip(self, report))]
    fn snapshot_report(&self, title: &str, report: &SnapshotReport) {
        self.output_json(&serde_json::json!({
            "name": title,
            "report": report,
        }));
    }

    fn diff_result(&self, result: &DiffResult) {
        self.output_json(result);
    }

    fn check_result(&self, result: &CheckResult) {
        self.output_json(result);
    }

    #[instrument(skip(self))]
    fn already_active(&self, name: &str) {
        self.output_json(&serde_json::json!({
            "name": name,
            "applied": false,
            "already_active": true,
        }));
    }

    #[instrument(skip(self, report))]
    fn apply_report(&self, name: &str, report: &ApplyReport) {
        self.output_json(&serde_json::json!({
            "name": name,
            "applied": true,
            "report": report,
        }));
    }

    fn vendors(&self, vendors: &[String]) {
        self.output_json(&serde_json::json!({ "vendors": vendors }));
    }

    fn config_path(&self, path: &Path, exists: bool) {
        self.output_json(&serde_json::json!({
            "path": path.display().to_string(),
            "exists": exists,
        }));
    }

    fn config(&self, config: &EngineConfig) {
        self.output_json(config);
    }

    #[instrument(skip(self))]
    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>) {
        self.output_json(&serde_json::json!({
            "version": version,
            "git_sha": git_sha,
            "build_time": build_time,
            "rustc": option_env!("VERGEN_RUSTC_SEMVER"),
            "target": option_env!("VERGEN_CARGO_TARGET_TRIPLE"),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_formats() {
        let data = serde_json::json!({ "a": 1, "b": [1, 2] });
        let pretty = RobotOutput::new(RobotFormat::Json).render(&data);
        assert!(pretty.contains('\n'));
        let compact = RobotOutput::new(RobotFormat::JsonCompact).render(&data);
        assert!(!compact.contains('\n'));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&compact).unwrap(),
            data
        );
    }
}
