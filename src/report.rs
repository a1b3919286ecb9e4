//! Human-readable description of a snapshot.
//!
//! A saved snapshot is described from its own data. When a platform is at
//! hand, each path is enriched with what the OS reports about it right now:
//! monitor names, preferred mode, connector type and so on.

use std::fmt::{self, Write as _};

use serde::Serialize;
use tracing::trace;

use crate::platform::{Platform, TargetDeviceName, TargetPreferredMode};
use crate::snapshot::{
    AdapterEntry, HdrState, LegacyDisplaySetting, ModeInfo, OutputTechnology, Snapshot,
    TaskbarLayoutRecord,
};

/// One display path as described to the user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathReport {
    pub index: usize,
    pub active: bool,
    pub source_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub clone_member: bool,
    pub target_id: u32,
    pub output_technology: OutputTechnology,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<(i32, i32)>,
    pub refresh_hz: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetDeviceName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_mode: Option<TargetPreferredMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_resolution: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<OutputTechnology>,
}

/// Full description of a snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotReport {
    pub is_cloned: bool,
    pub paths: Vec<PathReport>,
    pub adapters: Vec<AdapterEntry>,
    pub hdr: Vec<HdrState>,
    pub legacy_settings: Vec<LegacyDisplaySetting>,
    pub taskbar: Vec<TaskbarLayoutRecord>,
    pub fingerprints: Vec<String>,
}

/// Describe a snapshot from its own data.
#[must_use]
pub fn describe(snapshot: &Snapshot) -> SnapshotReport {
    let members = snapshot.clone_member_indices();

    let paths = snapshot
        .paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let source_mode = snapshot
                .modes
                .get(path.source.mode_info_idx as usize)
                .and_then(|m| match &m.info {
                    ModeInfo::Source(s) => Some(s),
                    _ => None,
                });
            PathReport {
                index,
                active: path.is_active(),
                source_id: path.source.id,
                source_name: snapshot.source_name_of(index).map(str::to_string),
                clone_member: members.contains(&index),
                target_id: path.target.id,
                output_technology: path.target.output_technology,
                adapter_path: snapshot
                    .adapters
                    .device_path(path.target.adapter_id)
                    .map(str::to_string),
                resolution: source_mode.map(|s| (s.width, s.height)),
                position: source_mode.map(|s| (s.position.x, s.position.y)),
                refresh_hz: path.target.refresh_rate.as_f64(),
                ..PathReport::default()
            }
        })
        .collect();

    SnapshotReport {
        is_cloned: snapshot.is_cloned,
        paths,
        adapters: snapshot.adapters.iter().cloned().collect(),
        hdr: snapshot.hdr_states.clone(),
        legacy_settings: snapshot.legacy_settings.values().cloned().collect(),
        taskbar: snapshot.taskbar_layout.clone(),
        fingerprints: snapshot.fingerprints.clone(),
    }
}

/// Describe a snapshot and add what the OS reports about each path now.
///
/// Failed queries leave the corresponding fields empty.
#[must_use]
pub fn describe_live<P: Platform>(platform: &P, snapshot: &Snapshot) -> SnapshotReport {
    let mut report = describe(snapshot);
    for (row, path) in report.paths.iter_mut().zip(&snapshot.paths) {
        let (adapter, source, target) =
            (path.target.adapter_id, path.source.id, path.target.id);
        trace!(%adapter, target, "Describing path");
        if let Ok(name) = platform.source_name(path.source.adapter_id, source) {
            row.source_name = Some(name);
        }
        row.target = platform.target_name(adapter, target).ok();
        row.preferred_mode = platform.target_preferred_mode(adapter, target).ok();
        row.virtual_resolution = platform.supports_virtual_resolution(adapter, target).ok();
        row.base_type = platform.target_base_type(adapter, target).ok();
    }
    report
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

impl fmt::Display for SnapshotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        writeln!(out, "Cloned: {}", yes_no(self.is_cloned))?;

        for p in &self.paths {
            writeln!(out)?;
            writeln!(
                out,
                "Path {} ({})",
                p.index,
                if p.active { "active" } else { "inactive" }
            )?;
            writeln!(
                out,
                "  Source:        {} (id {}){}",
                p.source_name.as_deref().unwrap_or("?"),
                p.source_id,
                if p.clone_member { ", clone member" } else { "" }
            )?;
            if let Some(t) = &p.target {
                writeln!(out, "  Monitor:       {}", t.friendly_name)?;
                writeln!(out, "  Connector:     {}", t.connector_instance)?;
                writeln!(
                    out,
                    "  EDID:          manufacturer {} product {}",
                    t.edid_manufacturer_id, t.edid_product_code_id
                )?;
                writeln!(out, "  Device path:   {}", t.monitor_device_path)?;
            }
            writeln!(out, "  Target id:     {}", p.target_id)?;
            writeln!(out, "  Technology:    {}", p.output_technology)?;
            if let Some(base) = p.base_type {
                writeln!(out, "  Base type:     {base}")?;
            }
            if let Some((w, h)) = p.resolution {
                write!(out, "  Mode:          {w}x{h} @ {:.2} Hz", p.refresh_hz)?;
                if let Some((x, y)) = p.position {
                    write!(out, " at ({x}, {y})")?;
                }
                writeln!(out)?;
            }
            if let Some(pref) = &p.preferred_mode {
                writeln!(out, "  Preferred:     {}x{}", pref.width, pref.height)?;
            }
            if let Some(v) = p.virtual_resolution {
                writeln!(out, "  Virtual res:   {}", yes_no(v))?;
            }
            if let Some(adapter) = &p.adapter_path {
                writeln!(out, "  Adapter:       {adapter}")?;
            }
        }

        if !self.hdr.is_empty() {
            writeln!(out)?;
            writeln!(out, "HDR")?;
            for h in &self.hdr {
                writeln!(
                    out,
                    "  target {}: supported {}, enabled {}, {} bpc, SDR white {}",
                    h.target_id,
                    yes_no(h.advanced_color.advanced_color_supported),
                    yes_no(h.advanced_color.advanced_color_enabled),
                    h.advanced_color.bits_per_color_channel,
                    h.sdr_white_level.level
                )?;
            }
        }

        if !self.legacy_settings.is_empty() {
            writeln!(out)?;
            writeln!(out, "Display devices")?;
            for s in &self.legacy_settings {
                writeln!(
                    out,
                    "  {}{}: {}x{} {} bpp @ {} Hz, orientation {}",
                    s.device_name,
                    if s.is_primary { " (primary)" } else { "" },
                    s.mode.width,
                    s.mode.height,
                    s.mode.bits_per_pixel,
                    s.mode.frequency,
                    s.mode.orientation
                )?;
            }
        }

        if !self.taskbar.is_empty() {
            writeln!(out)?;
            writeln!(out, "Taskbar")?;
            for t in &self.taskbar {
                writeln!(
                    out,
                    "  {}: {:?} edge, v{}{}",
                    t.device_path,
                    t.edge,
                    t.version,
                    if t.auto_hide { ", auto-hide" } else { "" }
                )?;
            }
        }
        f.write_str(out.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::DisplayEngine;
    use crate::platform::mock::{MockDisplay, MockPlatform, MockPlatformBuilder};
    use crate::snapshot::AdapterId;

    const GPU: AdapterId = AdapterId(0x77);

    fn capture() -> (DisplayEngine<MockPlatform>, Snapshot) {
        let mock = MockPlatformBuilder::new()
            .adapter(GPU, r"\\?\PCI#VEN_8086&DEV_46A6#igpu")
            .display(MockDisplay::new(GPU, 0, 10).hdr(true).friendly_name("Office Left"))
            .display(MockDisplay::new(GPU, 1, 11).at(1920, 0).resolution(2560, 1440))
            .build();
        let mut engine = DisplayEngine::new(mock, EngineConfig::default());
        let snap = engine.capture_active().unwrap();
        (engine, snap)
    }

    #[test]
    fn test_describe_offline() {
        let (_, snap) = capture();
        let report = describe(&snap);
        assert_eq!(report.paths.len(), 2);
        assert_eq!(report.paths[1].resolution, Some((2560, 1440)));
        assert_eq!(report.paths[1].position, Some((1920, 0)));
        assert_eq!(report.paths[0].source_name.as_deref(), Some(r"\\.\DISPLAY1"));
        assert!(report.paths[0].target.is_none());
        assert_eq!(report.hdr.len(), 2);
    }

    #[test]
    fn test_describe_live_adds_monitor_details() {
        let (engine, snap) = capture();
        let report = describe_live(engine.platform(), &snap);
        let target = report.paths[0].target.as_ref().unwrap();
        assert_eq!(target.friendly_name, "Office Left");
        assert_eq!(report.paths[0].base_type, Some(OutputTechnology::Hdmi));

        let text = report.to_string();
        assert!(text.contains("Office Left"));
        assert!(text.contains("2560x1440"));
        assert!(text.contains("Taskbar"));
    }
}
