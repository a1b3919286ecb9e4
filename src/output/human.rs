//! Human-friendly output implementation using console.

use std::path::Path;

use console::{Term, measure_text_width};
use tracing::{debug, instrument, trace};

use crate::config::{EngineConfig, to_toml};
use crate::engine::ApplyReport;
use crate::error::DprofError;
use crate::report::SnapshotReport;
use crate::snapshot::{Snapshot, SnapshotSummary};
use crate::theme::DprofTheme;

use super::{CheckResult, DiffResult, Output};

const DEFAULT_WIDTH: usize = 80;

/// Styled terminal output implementation for human users.
pub struct HumanOutput {
    theme: DprofTheme,
}

impl HumanOutput {
    #[instrument]
    pub fn new(no_color: bool) -> Self {
        debug!("Creating HumanOutput");
        let theme = if no_color {
            console::set_colors_enabled(false);
            DprofTheme::plain()
        } else {
            DprofTheme::default()
        };
        Self { theme }
    }

    fn width() -> usize {
        let term = Term::stdout();
        if term.is_term() {
            usize::from(term.size().1)
        } else {
            DEFAULT_WIDTH
        }
    }

    /// Horizontal rule with an optional title.
    fn rule(&self, title: Option<&str>) {
        let width = Self::width().min(DEFAULT_WIDTH);
        match title {
            Some(t) => {
                let used = measure_text_width(t) + 4;
                let line = "─".repeat(width.saturating_sub(used));
                println!(
                    "{} {} {}",
                    self.theme.accent.apply_to("──"),
                    self.theme.header.apply_to(t),
                    self.theme.accent.apply_to(line)
                );
            }
            None => println!("{}", self.theme.accent.apply_to("─".repeat(width))),
        }
    }

    fn field(&self, name: &str, value: impl std::fmt::Display) {
        println!(
            "  {}{}",
            self.theme.label.apply_to(format!("{name:<12}")),
            self.theme.value.apply_to(value)
        );
    }

    fn yes_no(&self, value: bool) -> String {
        if value {
            self.theme.active.apply_to("yes").to_string()
        } else {
            self.theme.inactive.apply_to("no").to_string()
        }
    }
}

impl Output for HumanOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        debug!(message, "Outputting success");
        println!("{} {message}", self.theme.success.apply_to("[OK]"));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &DprofError) {
        debug!(
            error = %error,
            recoverable = error.is_user_recoverable(),
            "Outputting error"
        );
        eprintln!();
        eprintln!(
            "  {} {}",
            self.theme.error.apply_to("[ERR]"),
            self.theme.value.apply_to(error)
        );

        if let DprofError::DisplaysMissing { missing, .. } = error {
            eprintln!();
            eprintln!("  {}", self.theme.label.apply_to("Missing displays:"));
            for fingerprint in missing {
                eprintln!("    - {}", self.theme.fingerprint.apply_to(fingerprint));
            }
        }

        if let Some(suggestion) = error.suggestion() {
            trace!(suggestion, "Adding suggestion");
            eprintln!();
            eprintln!("  {}", self.theme.label.apply_to("Suggestion:"));
            eprintln!("  {}", self.theme.muted.apply_to(suggestion));
        }
        eprintln!();
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        debug!(message, "Outputting warning");
        eprintln!("{} {message}", self.theme.warning.apply_to("[WARN]"));
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        debug!(message, "Outputting info");
        println!("{} {message}", self.theme.accent.apply_to("[INFO]"));
    }

    #[instrument(skip_all)]
    fn captured(&self, _snapshot: &Snapshot, report: &SnapshotReport, saved_as: Option<&str>) {
        self.snapshot_report("Captured configuration", report);
        if let Some(name) = saved_as {
            println!();
            self.success(&format!(
                "Saved as {}",
                self.theme.snapshot_name.apply_to(name)
            ));
        }
    }

    #[instrument(skip_all, fields(count = snapshots.len()))]
    fn snapshot_list(&self, snapshots: &[SnapshotSummary]) {
        if snapshots.is_empty() {
            self.info("No saved snapshots. Run: dprof capture --save <NAME>");
            return;
        }
        self.rule(Some("Saved snapshots"));
        for s in snapshots {
            let cloned = if s.is_cloned { ", cloned" } else { "" };
            println!(
                "  {}  {}",
                self.theme.snapshot_name.apply_to(&s.name),
                self.theme.muted.apply_to(format!(
                    "{} display(s), {} active path(s){cloned}, updated {}",
                    s.display_count,
                    s.active_paths,
                    s.updated_at.format("%Y-%m-%d %H:%M")
                ))
            );
            if let Some(description) = &s.description {
                println!("      {description}");
            }
        }
    }

    #[instrument(skip(self, report))]
    fn snapshot_report(&self, title: &str, report: &SnapshotReport) {
        self.rule(Some(title));
        println!("{report}");
    }

    fn diff_result(&self, result: &DiffResult) {
        let header = format!("{} vs {}", result.first, result.second);
        if result.identical {
            self.success(&format!("{header}: structurally equal"));
            return;
        }
        println!(
            "{} {header}: {} component(s) differ",
            self.theme.warning.apply_to("[DIFF]"),
            result.differing.len()
        );
        for component in &result.differing {
            println!("    - {component}");
        }
    }

    fn check_result(&self, result: &CheckResult) {
        self.rule(Some(&result.name));
        self.field("Possible", self.yes_no(result.possible));
        match result.valid {
            Some(valid) => self.field("Valid", self.yes_no(valid)),
            None => self.field("Valid", self.theme.muted.apply_to("not checked")),
        }
        self.field("Active", self.yes_no(result.active));
        if !result.missing_displays.is_empty() {
            println!("  {}", self.theme.label.apply_to("Missing displays:"));
            for fingerprint in &result.missing_displays {
                println!("    - {}", self.theme.fingerprint.apply_to(fingerprint));
            }
        }
    }

    #[instrument(skip(self))]
    fn already_active(&self, name: &str) {
        self.info(&format!(
            "{} is already the active configuration (use --force to reapply)",
            self.theme.snapshot_name.apply_to(name)
        ));
    }

    #[instrument(skip(self, report))]
    fn apply_report(&self, name: &str, report: &ApplyReport) {
        self.success(&format!(
            "Applied {} ({} after {} attempt(s))",
            self.theme.snapshot_name.apply_to(name),
            report.step,
            report.attempts
        ));
        if report.adapter_fallbacks > 0 {
            self.warning(&format!(
                "{} adapter(s) were mapped to the first live adapter",
                report.adapter_fallbacks
            ));
        }
        if !report.unresolved_clone_targets.is_empty() {
            self.warning(&format!(
                "No live display found for clone target(s) {:?}",
                report.unresolved_clone_targets
            ));
        }
        if report.taskbar_records_skipped > 0 {
            self.warning(&format!(
                "{} taskbar record(s) had an unsupported format and were skipped",
                report.taskbar_records_skipped
            ));
        }
        self.field("HDR", format!("{} change(s)", report.hdr_changes));
        self.field(
            "Devices",
            format!("{} legacy setting(s)", report.legacy_settings_applied),
        );
        self.field(
            "Taskbar",
            format!(
                "{} record(s){}",
                report.taskbar_records_written,
                if report.taskbar_settings_applied {
                    ", settings restored"
                } else {
                    ""
                }
            ),
        );
    }

    fn vendors(&self, vendors: &[String]) {
        if vendors.is_empty() {
            self.warning("No PCI video cards found");
            return;
        }
        for vendor in vendors {
            println!("{}", self.theme.value.apply_to(vendor));
        }
    }

    fn config_path(&self, path: &Path, exists: bool) {
        println!("{}", path.display());
        if !exists {
            eprintln!(
                "{}",
                self.theme.muted.apply_to("(file does not exist; defaults are in effect)")
            );
        }
    }

    fn config(&self, config: &EngineConfig) {
        match to_toml(config) {
            Ok(text) => print!("{text}"),
            Err(e) => self.error(&e),
        }
    }

    #[instrument(skip(self))]
    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>) {
        debug!(version, ?git_sha, ?build_time, "Outputting version info");
        self.rule(Some("dprof"));
        self.field("Version", version);

        if let Some(sha) = git_sha {
            let dirty =
                sha.contains("dirty") || matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true"));
            let clean_sha = sha.replace("(dirty)", "").trim().to_string();
            if dirty {
                self.field(
                    "Git SHA",
                    format!("{clean_sha} {}", self.theme.warning.apply_to("(dirty)")),
                );
            } else {
                self.field("Git SHA", clean_sha);
            }
        }
        if let Some(time) = build_time {
            self.field("Built", self.theme.muted.apply_to(time));
        }
        if let Some(rustc) = option_env!("VERGEN_RUSTC_SEMVER") {
            self.field("Rust", self.theme.muted.apply_to(rustc));
        }
        if let Some(target) = option_env!("VERGEN_CARGO_TARGET_TRIPLE") {
            self.field("Target", self.theme.muted.apply_to(target));
        }
    }
}
