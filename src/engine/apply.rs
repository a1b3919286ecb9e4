//! Committing a saved snapshot.
//!
//! The topology goes through a ladder of increasingly permissive
//! `SetDisplayConfig` flag sets. Once one step commits, the secondary state
//! (HDR, legacy per-device settings, taskbar) is brought in line.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::DisplayEngine;
use crate::error::{ApplyStage, DprofError, Result};
use crate::platform::{Platform, SetConfigFlags, Win32Status};
use crate::snapshot::{HdrState, LegacyDisplaySetting, Snapshot, StuckRect, TaskbarLayoutRecord};

/// One attempt of the commit ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyStep {
    pub name: &'static str,
    pub flags: SetConfigFlags,
    /// Rejection status that moves on to the next step.
    pub escalate_on: Win32Status,
}

const SUPPLIED: SetConfigFlags = SetConfigFlags::APPLY
    .union(SetConfigFlags::USE_SUPPLIED_DISPLAY_CONFIG)
    .union(SetConfigFlags::SAVE_TO_DATABASE)
    .union(SetConfigFlags::ALLOW_CHANGES);

/// Commit steps, most faithful first.
pub const APPLY_LADDER: [ApplyStep; 3] = [
    ApplyStep {
        name: "supplied with mode enumeration",
        flags: SUPPLIED.union(SetConfigFlags::FORCE_MODE_ENUMERATION),
        escalate_on: Win32Status::INVALID_PARAMETER,
    },
    ApplyStep {
        name: "supplied",
        flags: SUPPLIED,
        escalate_on: Win32Status::INVALID_PARAMETER,
    },
    ApplyStep {
        name: "topology only",
        flags: SetConfigFlags::APPLY
            .union(SetConfigFlags::TOPOLOGY_SUPPLIED)
            .union(SetConfigFlags::ALLOW_CHANGES)
            .union(SetConfigFlags::ALLOW_PATH_ORDER_CHANGES),
        escalate_on: Win32Status::INVALID_PARAMETER,
    },
];

/// What an apply changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Ladder step that committed the topology.
    pub step: &'static str,
    pub attempts: usize,
    pub adapter_fallbacks: usize,
    pub clone_substitutions: usize,
    pub unresolved_clone_targets: Vec<u32>,
    pub hdr_changes: usize,
    pub legacy_settings_applied: usize,
    pub taskbar_records_written: usize,
    pub taskbar_records_skipped: usize,
    pub taskbar_settings_applied: bool,
}

impl<P: Platform> DisplayEngine<P> {
    /// Reconcile `snapshot` with the live hardware and commit it.
    ///
    /// # Errors
    ///
    /// `ApplyRejected` when no ladder step commits the topology;
    /// `PartialApply` when the topology committed but a secondary stage failed.
    #[instrument(skip_all)]
    pub fn apply(&mut self, snapshot: &Snapshot) -> Result<ApplyReport> {
        let working = self.prepare(snapshot)?;
        let mut report = ApplyReport {
            adapter_fallbacks: working.adapter_remap.fallbacks().len(),
            clone_substitutions: working.clone_remap.substitutions.len(),
            unresolved_clone_targets: working
                .clone_remap
                .unresolved
                .iter()
                .map(|(_, id)| *id)
                .collect(),
            ..ApplyReport::default()
        };
        let target = working.snapshot;

        let (step, attempts) = self.commit_topology(&target)?;
        report.step = step.name;
        report.attempts = attempts;
        info!(step = step.name, attempts, "Display topology applied");

        if self.config.settle_delay_ms > 0 {
            debug!(ms = self.config.settle_delay_ms, "Waiting for displays to settle");
            std::thread::sleep(Duration::from_millis(self.config.settle_delay_ms));
        }

        report.hdr_changes = self.sync_hdr(&target.hdr_states)?;
        report.legacy_settings_applied = self.sync_legacy_settings(&target)?;
        let (written, skipped) = self.restore_taskbar_layout(&target.taskbar_layout)?;
        report.taskbar_records_written = written;
        report.taskbar_records_skipped = skipped;
        report.taskbar_settings_applied = self.restore_taskbar_settings(&target);
        self.platform.refresh_tray_area();

        if let Err(e) = self.capture_active() {
            warn!(error = %e, "Could not refresh the captured configuration after apply");
        }
        Ok(report)
    }

    fn commit_topology(&self, target: &Snapshot) -> Result<(ApplyStep, usize)> {
        let mut last = Win32Status::SUCCESS;
        for (i, step) in APPLY_LADDER.iter().enumerate() {
            debug!(step = step.name, flags = ?step.flags, "Committing topology");
            match self
                .platform
                .set_config(&target.paths, &target.modes, step.flags)
            {
                Ok(()) => return Ok((*step, i + 1)),
                Err(status) if status == step.escalate_on => {
                    warn!(step = step.name, %status, "Topology rejected, trying next step");
                    last = status;
                }
                Err(status) => {
                    error!(step = step.name, %status, "Topology rejected");
                    return Err(DprofError::ApplyRejected {
                        step: step.name,
                        flags: step.flags,
                        status,
                    });
                }
            }
        }
        let step = APPLY_LADDER[APPLY_LADDER.len() - 1];
        error!(%last, "Every apply step was rejected");
        Err(DprofError::ApplyRejected {
            step: step.name,
            flags: step.flags,
            status: last,
        })
    }

    /// Set the advanced color flag where the live value differs.
    fn sync_hdr(&self, states: &[HdrState]) -> Result<usize> {
        let mut changed = 0;
        for state in states {
            let want = state.advanced_color.advanced_color_enabled;
            let live = match self
                .platform
                .advanced_color_info(state.adapter_id, state.target_id)
            {
                Ok(info) => info,
                Err(status) => {
                    warn!(target = state.target_id, %status, "Could not read live HDR state");
                    continue;
                }
            };
            if live.advanced_color_enabled == want {
                continue;
            }
            self.platform
                .set_advanced_color(state.adapter_id, state.target_id, want)
                .map_err(|status| {
                    error!(target = state.target_id, %status, "Failed to set HDR state");
                    DprofError::PartialApply {
                        stage: ApplyStage::Hdr,
                        subject: format!("target {}", state.target_id),
                        reason: status.to_string(),
                    }
                })?;
            info!(target = state.target_id, enabled = want, "HDR state changed");
            changed += 1;
        }
        Ok(changed)
    }

    /// Overlay the saved per-device settings onto the live modes.
    fn sync_legacy_settings(&self, target: &Snapshot) -> Result<usize> {
        if target.legacy_settings.is_empty() {
            return Ok(0);
        }
        let devices = self.platform.display_devices().map_err(|status| {
            DprofError::PartialApply {
                stage: ApplyStage::LegacySettings,
                subject: "display devices".to_string(),
                reason: status.to_string(),
            }
        })?;

        let mut applied = 0;
        for (key, saved) in &target.legacy_settings {
            let Some(device) = devices.iter().find(|d| &d.device_key == key) else {
                debug!(device_key = %key, "Saved device is not present, skipping");
                continue;
            };
            self.apply_legacy_setting(&device.device_name, saved)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn apply_legacy_setting(&self, device_name: &str, saved: &LegacyDisplaySetting) -> Result<()> {
        let fresh = self
            .platform
            .current_device_mode(device_name)
            .map_err(|status| DprofError::PartialApply {
                stage: ApplyStage::LegacySettings,
                subject: saved.device_key.clone(),
                reason: status.to_string(),
            })?;
        let merged = fresh.overlay(&saved.mode);
        let result = self.platform.change_device_mode(device_name, &merged);
        if !result.is_success() {
            error!(device = %device_name, %result, "Legacy display setting rejected");
            return Err(DprofError::legacy_rejected(&saved.device_key, result));
        }
        debug!(device = %device_name, frequency = merged.frequency, "Legacy display setting applied");
        Ok(())
    }

    /// Write the restorable taskbar records; returns (written, skipped).
    fn restore_taskbar_layout(&self, records: &[TaskbarLayoutRecord]) -> Result<(usize, usize)> {
        let mut written = 0;
        let mut skipped = 0;
        let mut main_edge = None;
        for record in records {
            if !record.is_restorable() {
                error!(
                    device_path = %record.device_path,
                    version = record.version,
                    "Unsupported taskbar record version, skipping"
                );
                skipped += 1;
                continue;
            }
            let stuck = StuckRect {
                version: record.version,
                binary: record.binary.clone(),
            };
            self.platform
                .write_stuck_rect(&record.device_path, &stuck)
                .map_err(|status| DprofError::PartialApply {
                    stage: ApplyStage::TaskbarLayout,
                    subject: record.device_path.clone(),
                    reason: status.to_string(),
                })?;
            if record.main_screen {
                main_edge = Some(record.edge);
            }
            written += 1;
        }

        if let Some(edge) = main_edge {
            if let Err(status) = self.platform.reposition_main_taskbar(edge) {
                warn!(%status, "Could not reposition the main taskbar");
            }
        }
        if records.len() > 1 {
            if let Err(status) = self.platform.reposition_secondary_taskbars() {
                warn!(%status, "Could not reposition secondary taskbars");
            }
        }
        Ok((written, skipped))
    }

    /// Apply the saved taskbar options when they differ from the live ones.
    fn restore_taskbar_settings(&self, target: &Snapshot) -> bool {
        if target.taskbar_settings.options.is_empty() {
            return false;
        }
        match self.platform.taskbar_settings() {
            Ok(live) if live == target.taskbar_settings => return false,
            Ok(_) => {}
            Err(status) => warn!(%status, "Could not read live taskbar settings"),
        }
        match self.platform.apply_taskbar_settings(&target.taskbar_settings) {
            Ok(()) => {
                info!("Taskbar settings restored");
                true
            }
            Err(status) => {
                error!(stage = %ApplyStage::TaskbarSettings, %status, "Failed to restore taskbar settings");
                false
            }
        }
    }
}
