//! Snapshot capture from the live display stack.

use std::collections::BTreeSet;

use tracing::{debug, error, instrument, trace, warn};

use super::clone_remap::plan_clone_remap;
use crate::error::{DprofError, Result};
use crate::platform::{
    DeviceStateFlags, Platform, QuerySelector, Topology, Win32Status, native_err,
};
use crate::snapshot::{
    AdapterTable, DeviceInfoHeader, DisplayPath, HdrState, LegacyDisplaySetting, MAIN_SCREEN_PATH,
    SdrWhiteLevel, Snapshot, TaskbarLayoutRecord, TaskbarSettings, fingerprint,
};

/// Query paths and modes, retrying once when the topology changes between the
/// size query and the data query.
pub(crate) fn query_topology<P: Platform>(platform: &P, selector: QuerySelector) -> Result<Topology> {
    for attempt in 0..2 {
        let sizes = platform
            .buffer_sizes(selector)
            .map_err(native_err("GetDisplayConfigBufferSizes"))?;
        trace!(?selector, paths = sizes.paths, modes = sizes.modes, "Buffer sizes");
        match platform.query_config(selector, sizes) {
            Ok(topology) => return Ok(topology),
            Err(Win32Status::INSUFFICIENT_BUFFER) if attempt == 0 => {
                warn!("Display topology changed during query, retrying once");
            }
            Err(Win32Status::INSUFFICIENT_BUFFER) => {
                error!("Display topology changed again during query, giving up");
                return Err(DprofError::BufferRace);
            }
            Err(status) => {
                error!(%status, "QueryDisplayConfig failed");
                return Err(native_err("QueryDisplayConfig")(status));
            }
        }
    }
    Err(DprofError::BufferRace)
}

/// Adapter device paths of every target adapter, in path order.
pub(crate) fn adapter_table<P: Platform>(platform: &P, paths: &[DisplayPath]) -> AdapterTable {
    let mut table = AdapterTable::new();
    let mut failed = BTreeSet::new();
    for path in paths {
        let handle = path.target.adapter_id;
        if table.contains(handle) || failed.contains(&handle) {
            continue;
        }
        match platform.adapter_name(handle) {
            Ok(device_path) => {
                trace!(adapter = %handle, %device_path, "Adapter name");
                table.insert(handle, device_path);
            }
            Err(status) => {
                error!(adapter = %handle, %status, "Failed to read adapter name");
                failed.insert(handle);
            }
        }
    }
    table
}

/// Sorted, deduplicated fingerprints of the available targets of `paths`.
pub(crate) fn fingerprints<P: Platform>(
    platform: &P,
    paths: &[DisplayPath],
    adapters: &AdapterTable,
) -> Vec<String> {
    let mut out: Vec<String> = paths
        .iter()
        .filter(|p| p.target.target_available)
        .map(|p| {
            let target = platform
                .target_name(p.target.adapter_id, p.target.id)
                .inspect_err(|status| {
                    warn!(target = p.target.id, %status, "Failed to read target name");
                })
                .ok();
            fingerprint::build(adapters.device_path(p.target.adapter_id), target.as_ref())
        })
        .collect();
    fingerprint::normalize(&mut out);
    out
}

/// Group paths on their GDI source name and mark clone members.
fn group_sources<P: Platform>(platform: &P, snapshot: &mut Snapshot) {
    for (index, path) in snapshot.paths.iter_mut().enumerate() {
        let name = match platform.source_name(path.source.adapter_id, path.source.id) {
            Ok(name) => name,
            Err(status) => {
                warn!(source = path.source.id, %status, "Failed to read source name");
                continue;
            }
        };
        let group = snapshot.source_groups.entry(name).or_default();
        group.push(index);
        if group.len() > 1 {
            debug!(source = path.source.id, target = path.target.id, "Path is a clone member");
            path.mark_clone_member();
        }
    }
    snapshot.is_cloned = snapshot.has_clone_groups();
}

fn hdr_states<P: Platform>(platform: &P, paths: &[DisplayPath]) -> Vec<HdrState> {
    let mut seen = BTreeSet::new();
    let mut states = Vec::new();
    for path in paths {
        let (adapter_id, target_id) = (path.target.adapter_id, path.target.id);
        if !path.target.output_technology.supports_color_queries() {
            trace!(target = target_id, tech = %path.target.output_technology, "Skipping HDR query");
            continue;
        }
        if !seen.insert((adapter_id, target_id)) {
            continue;
        }
        let advanced_color = match platform.advanced_color_info(adapter_id, target_id) {
            Ok(info) => info,
            Err(status) => {
                warn!(target = target_id, %status, "Failed to read advanced color info");
                continue;
            }
        };
        let sdr_white_level = platform
            .sdr_white_level(adapter_id, target_id)
            .unwrap_or_else(|status| {
                warn!(target = target_id, %status, "Failed to read SDR white level");
                SdrWhiteLevel {
                    header: DeviceInfoHeader {
                        adapter_id,
                        id: target_id,
                    },
                    level: 0,
                }
            });
        states.push(HdrState {
            adapter_id,
            target_id,
            advanced_color,
            sdr_white_level,
        });
    }
    states
}

fn legacy_settings<P: Platform>(platform: &P, snapshot: &mut Snapshot) -> Result<()> {
    let devices = platform
        .display_devices()
        .map_err(native_err("EnumDisplayDevices"))?;
    for device in devices.into_iter().filter(|d| d.state_flags.is_captured()) {
        let mode = match platform.current_device_mode(&device.device_name) {
            Ok(mode) => mode,
            Err(status) => {
                warn!(device = %device.device_name, %status, "Failed to read device mode");
                continue;
            }
        };
        snapshot.legacy_settings.insert(
            device.device_key.clone(),
            LegacyDisplaySetting {
                is_enabled: device
                    .state_flags
                    .contains(DeviceStateFlags::ATTACHED_TO_DESKTOP),
                is_primary: device.state_flags.contains(DeviceStateFlags::PRIMARY_DEVICE),
                device_name: device.device_name,
                device_key: device.device_key,
                device_string: device.device_string,
                mode,
            },
        );
    }
    Ok(())
}

fn taskbar_layout<P: Platform>(platform: &P, fingerprints: &[String]) -> Vec<TaskbarLayoutRecord> {
    let mut keys: Vec<String> = Vec::new();
    for key in fingerprints.iter().filter_map(|f| fingerprint::taskbar_device_path(f)) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys.push(MAIN_SCREEN_PATH.to_string());

    let mut records = Vec::new();
    for key in keys {
        match platform.read_stuck_rect(&key) {
            Ok(Some(stuck)) => records.push(TaskbarLayoutRecord::decode(&key, Some(stuck))),
            Ok(None) => debug!(device_path = %key, "No taskbar record"),
            Err(status) => warn!(device_path = %key, %status, "Failed to read taskbar record"),
        }
    }
    records
}

/// Capture a full snapshot of the paths selected by `selector`.
#[instrument(skip(platform))]
pub(crate) fn capture_snapshot<P: Platform>(platform: &P, selector: QuerySelector) -> Result<Snapshot> {
    let topology = query_topology(platform, selector)?;
    let mut snapshot = Snapshot {
        paths: topology.paths,
        modes: topology.modes,
        ..Snapshot::new()
    };

    snapshot.adapters = adapter_table(platform, &snapshot.paths);
    snapshot.fingerprints = fingerprints(platform, &snapshot.paths, &snapshot.adapters);
    group_sources(platform, &mut snapshot);
    snapshot.hdr_states = hdr_states(platform, &snapshot.paths);

    if snapshot.is_cloned {
        let live = fingerprint::live_target_ids(&snapshot.fingerprints);
        let plan = plan_clone_remap(&snapshot, &live);
        snapshot = plan.apply(&snapshot);
    }

    legacy_settings(platform, &mut snapshot)?;
    snapshot.taskbar_layout = taskbar_layout(platform, &snapshot.fingerprints);
    snapshot.taskbar_settings = platform.taskbar_settings().unwrap_or_else(|status| {
        warn!(%status, "Failed to read taskbar settings");
        TaskbarSettings::default()
    });

    debug!(
        paths = snapshot.paths.len(),
        modes = snapshot.modes.len(),
        hdr = snapshot.hdr_states.len(),
        cloned = snapshot.is_cloned,
        "Snapshot captured"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockCall, MockDisplay, MockPlatformBuilder};
    use crate::snapshot::{AdapterId, MODE_IDX_INVALID, OutputTechnology};

    const GPU: AdapterId = AdapterId(0x1_0000_0001);

    fn builder() -> MockPlatformBuilder {
        MockPlatformBuilder::new().adapter(GPU, r"\\?\PCI#VEN_1002&DEV_73BF#gpu")
    }

    #[test]
    fn test_retry_once_on_buffer_race() {
        let mock = builder().display(MockDisplay::new(GPU, 0, 1)).build();
        mock.race_buffers(1);
        let topo = query_topology(&mock, QuerySelector::active(true)).unwrap();
        assert_eq!(topo.paths.len(), 1);
    }

    #[test]
    fn test_second_race_is_fatal() {
        let mock = builder().display(MockDisplay::new(GPU, 0, 1)).build();
        mock.race_buffers(2);
        let err = query_topology(&mock, QuerySelector::active(true)).unwrap_err();
        assert!(matches!(err, DprofError::BufferRace));
    }

    #[test]
    fn test_other_query_failure_is_native_error() {
        let mock = builder().display(MockDisplay::new(GPU, 0, 1)).build();
        mock.fail(MockCall::QueryConfig, Win32Status::ACCESS_DENIED);
        let err = query_topology(&mock, QuerySelector::active(true)).unwrap_err();
        assert!(matches!(err, DprofError::NativeCall { .. }));
    }

    #[test]
    fn test_capture_basic() {
        let mock = builder()
            .display(MockDisplay::new(GPU, 0, 4353).hdr(true))
            .display(MockDisplay::new(GPU, 1, 4354).at(1920, 0))
            .build();
        let snap = capture_snapshot(&mock, QuerySelector::active(true)).unwrap();

        assert_eq!(snap.paths.len(), 2);
        assert_eq!(snap.adapters.len(), 1);
        assert_eq!(snap.fingerprints.len(), 2);
        assert!(!snap.is_cloned);
        assert_eq!(snap.hdr_states.len(), 2);
        assert!(snap.hdr_states[0].advanced_color.advanced_color_enabled);
        assert_eq!(snap.legacy_settings.len(), 2);
        assert_eq!(snap.taskbar_layout.len(), 3);
        assert!(snap.taskbar_layout.iter().any(|r| r.main_screen));
    }

    #[test]
    fn test_hdr_skipped_for_legacy_connectors() {
        let mock = builder()
            .display(MockDisplay::new(GPU, 0, 1).technology(OutputTechnology::Dvi))
            .display(MockDisplay::new(GPU, 1, 2).technology(OutputTechnology::Hd15))
            .build();
        let snap = capture_snapshot(&mock, QuerySelector::active(true)).unwrap();
        assert!(snap.hdr_states.is_empty());
    }

    #[test]
    fn test_white_level_failure_keeps_entry() {
        let mock = builder().display(MockDisplay::new(GPU, 0, 1).hdr(true)).build();
        mock.fail(MockCall::SdrWhiteLevel, Win32Status::GEN_FAILURE);
        let snap = capture_snapshot(&mock, QuerySelector::active(true)).unwrap();
        assert_eq!(snap.hdr_states.len(), 1);
        assert_eq!(snap.hdr_states[0].sdr_white_level.level, 0);
        assert!(snap.hdr_states[0].is_consistent());
    }

    #[test]
    fn test_advanced_color_failure_drops_entry() {
        let mock = builder().display(MockDisplay::new(GPU, 0, 1).hdr(true)).build();
        mock.fail(MockCall::AdvancedColorInfo, Win32Status::NOT_SUPPORTED);
        let snap = capture_snapshot(&mock, QuerySelector::active(true)).unwrap();
        assert!(snap.hdr_states.is_empty());
    }

    #[test]
    fn test_clone_members_marked() {
        let mock = builder()
            .display(MockDisplay::new(GPU, 0, 100))
            .display(MockDisplay::new(GPU, 0, 200))
            .build();
        let snap = capture_snapshot(&mock, QuerySelector::active(true)).unwrap();
        assert!(snap.is_cloned);
        assert_eq!(snap.source_groups.values().next(), Some(&vec![0, 1]));
        assert_eq!(snap.paths[0].source.mode_info_idx, 0);
        assert_eq!(snap.paths[1].source.mode_info_idx, MODE_IDX_INVALID);
        assert_eq!(snap.paths[1].target.mode_info_idx, MODE_IDX_INVALID);
        assert!(snap.paths[1].is_active());
        // Both targets were live, so nothing moved.
        assert_eq!(snap.paths[1].target.id, 200);
    }

    #[test]
    fn test_unavailable_targets_have_no_fingerprint() {
        let mock = builder()
            .display(MockDisplay::new(GPU, 0, 1))
            .display(MockDisplay::new(GPU, 1, 2).unavailable())
            .build();
        let snap = capture_snapshot(&mock, QuerySelector::all_paths(true)).unwrap();
        assert_eq!(snap.paths.len(), 2);
        assert_eq!(snap.fingerprints.len(), 1);
    }

    #[test]
    fn test_target_name_failure_uses_placeholders() {
        let mock = builder().display(MockDisplay::new(GPU, 0, 1)).build();
        mock.fail(MockCall::TargetName, Win32Status::GEN_FAILURE);
        let snap = capture_snapshot(&mock, QuerySelector::active(true)).unwrap();
        assert!(snap.fingerprints[0].ends_with("|#|#|#|#|#"));
        // No monitor path, so only the main screen record remains.
        assert_eq!(snap.taskbar_layout.len(), 1);
    }
}
