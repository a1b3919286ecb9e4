//! Mock display stack for unit testing.
//!
//! The mock holds a live topology, answers every query from it, records all
//! mutating calls and lets tests script failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use dprof::platform::mock::{MockDisplay, MockPlatformBuilder, Operation};
//! use dprof::snapshot::AdapterId;
//!
//! let gpu = AdapterId(0x1000);
//! let mock = MockPlatformBuilder::new()
//!     .adapter(gpu, r"\\?\PCI#VEN_10DE&DEV_2482")
//!     .display(MockDisplay::new(gpu, 0, 4353).hdr(false))
//!     .display(MockDisplay::new(gpu, 1, 4354).at(1920, 0))
//!     .build();
//!
//! // ... drive an engine with `mock` ...
//!
//! mock.assert_contains(&Operation::RefreshTrayArea);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::{debug, trace};

use super::{
    BufferSizes, DeviceStateFlags, DispChange, DisplayApi, GdiDevice, NativeResult,
    QuerySelector, SetConfigFlags, TargetDeviceName, TargetPreferredMode, TaskbarApi, Topology,
    Win32Status,
};
use crate::snapshot::{
    AdapterId, AdvancedColorInfo, DeviceInfoHeader, DisplayMode, DisplayPath, LegacyDeviceMode,
    MAIN_SCREEN_PATH, MODE_IDX_INVALID, ModeInfo, ModeKind, OutputTechnology, PATH_ACTIVE,
    PathSource, PathTarget, Point, Rational, SdrWhiteLevel, Size2D, SourceMode, StuckRect,
    TaskbarEdge, TaskbarSettings, VideoSignalInfo,
};

/// Recorded operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    QueryConfig {
        selector: QuerySelector,
    },
    SetConfig {
        flags: SetConfigFlags,
        paths: usize,
        modes: usize,
    },
    SetAdvancedColor {
        adapter_id: AdapterId,
        target_id: u32,
        enable: bool,
    },
    ChangeDeviceMode {
        device_name: String,
        mode: LegacyDeviceMode,
    },
    WriteStuckRect {
        device_path: String,
        version: u32,
    },
    RepositionMainTaskbar {
        edge: TaskbarEdge,
    },
    RepositionSecondaryTaskbars,
    ApplyTaskbarSettings,
    RefreshTrayArea,
}

/// Native calls whose outcome can be scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    BufferSizes,
    QueryConfig,
    SourceName,
    TargetName,
    AdapterName,
    AdvancedColorInfo,
    SdrWhiteLevel,
    SetAdvancedColor,
    DisplayDevices,
    CurrentDeviceMode,
    WriteStuckRect,
    RepositionMainTaskbar,
    TaskbarSettings,
    ApplyTaskbarSettings,
}

/// One simulated monitor on one path.
#[derive(Debug, Clone)]
pub struct MockDisplay {
    pub adapter_id: AdapterId,
    pub source_id: u32,
    pub target_id: u32,
    pub gdi_name: String,
    pub output_technology: OutputTechnology,
    pub edid_manufacturer_id: u16,
    pub edid_product_code_id: u16,
    pub friendly_name: String,
    pub monitor_device_path: String,
    pub width: u32,
    pub height: u32,
    pub position: Point,
    pub refresh_hz: u32,
    /// `Some(enabled)` when the display supports advanced color.
    pub hdr: Option<bool>,
    pub active: bool,
    pub available: bool,
}

impl MockDisplay {
    /// A 1920x1080 60 Hz HDMI monitor at the origin.
    #[must_use]
    pub fn new(adapter_id: AdapterId, source_id: u32, target_id: u32) -> Self {
        Self {
            adapter_id,
            source_id,
            target_id,
            gdi_name: format!(r"\\.\DISPLAY{}", source_id + 1),
            output_technology: OutputTechnology::Hdmi,
            edid_manufacturer_id: 0x4C2D,
            edid_product_code_id: u16::try_from(target_id & 0xFFFF).unwrap_or(0),
            friendly_name: format!("Mock Monitor {target_id}"),
            monitor_device_path: format!(
                r"\\?\DISPLAY#MCK{target_id:04X}#5&1a2b3c4d&0&UID{target_id}#{{e6f07b5f-ee97-4a90-b076-33f57bf4eaa7}}"
            ),
            width: 1920,
            height: 1080,
            position: Point::default(),
            refresh_hz: 60,
            hdr: None,
            active: true,
            available: true,
        }
    }

    #[must_use]
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Point { x, y };
        self
    }

    #[must_use]
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn refresh(mut self, hz: u32) -> Self {
        self.refresh_hz = hz;
        self
    }

    #[must_use]
    pub fn technology(mut self, tech: OutputTechnology) -> Self {
        self.output_technology = tech;
        self
    }

    #[must_use]
    pub fn hdr(mut self, enabled: bool) -> Self {
        self.hdr = Some(enabled);
        self
    }

    #[must_use]
    pub fn gdi_name(mut self, name: impl Into<String>) -> Self {
        self.gdi_name = name.into();
        self
    }

    #[must_use]
    pub fn friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = name.into();
        self
    }

    /// Connected but not part of the active topology.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Path whose target is not physically available.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self.active = false;
        self
    }
}

#[derive(Debug, Clone)]
struct MockTarget {
    name: TargetDeviceName,
    preferred: TargetPreferredMode,
    hdr_supported: bool,
    hdr_enabled: bool,
    white_level: u32,
}

#[derive(Debug, Default)]
struct MockState {
    adapters: Vec<(AdapterId, String)>,
    active: Topology,
    inactive_paths: Vec<DisplayPath>,
    source_names: HashMap<(AdapterId, u32), String>,
    targets: HashMap<(AdapterId, u32), MockTarget>,
    gdi_devices: Vec<GdiDevice>,
    device_modes: HashMap<String, LegacyDeviceMode>,
    stuck_rects: HashMap<String, StuckRect>,
    taskbar_settings: TaskbarSettings,
}

/// Mock display stack for testing without a GPU.
pub struct MockPlatform {
    state: Mutex<MockState>,
    operation_log: Mutex<Vec<Operation>>,
    set_config_results: Mutex<VecDeque<Win32Status>>,
    buffer_races: Mutex<u32>,
    failures: Mutex<HashMap<MockCall, Win32Status>>,
    device_mode_results: Mutex<HashMap<String, DispChange>>,
}

impl MockPlatform {
    fn from_state(state: MockState) -> Self {
        Self {
            state: Mutex::new(state),
            operation_log: Mutex::new(Vec::new()),
            set_config_results: Mutex::new(VecDeque::new()),
            buffer_races: Mutex::new(0),
            failures: Mutex::new(HashMap::new()),
            device_mode_results: Mutex::new(HashMap::new()),
        }
    }

    // === Scripting ===

    /// Queue results for the next `set_config` calls; success once drained.
    pub fn queue_set_config_results(&self, results: impl IntoIterator<Item = Win32Status>) {
        self.set_config_results.lock().unwrap().extend(results);
    }

    /// Report a topology change during the next `count` data queries.
    pub fn race_buffers(&self, count: u32) {
        *self.buffer_races.lock().unwrap() = count;
    }

    /// Make every call of `call` fail with `status`.
    pub fn fail(&self, call: MockCall, status: Win32Status) {
        self.failures.lock().unwrap().insert(call, status);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Script the outcome of legacy mode changes for one GDI device.
    pub fn device_mode_result(&self, device_name: &str, result: DispChange) {
        self.device_mode_results
            .lock()
            .unwrap()
            .insert(device_name.to_string(), result);
    }

    // === Live state manipulation ===

    /// Replace the adapter handles, as a reboot or driver reload would.
    ///
    /// Every path, mode and target keyed by an old handle moves to the new one.
    pub fn rehandle_adapters(&self, remap: &[(AdapterId, AdapterId)]) {
        let mut state = self.state.lock().unwrap();
        let lookup = |id: AdapterId| {
            remap
                .iter()
                .find(|(old, _)| *old == id)
                .map_or(id, |(_, new)| *new)
        };
        for (handle, _) in &mut state.adapters {
            *handle = lookup(*handle);
        }
        let MockState {
            active,
            inactive_paths,
            ..
        } = &mut *state;
        for path in active.paths.iter_mut().chain(inactive_paths.iter_mut()) {
            path.source.adapter_id = lookup(path.source.adapter_id);
            path.target.adapter_id = lookup(path.target.adapter_id);
        }
        for mode in &mut state.active.modes {
            mode.adapter_id = lookup(mode.adapter_id);
        }
        state.source_names = std::mem::take(&mut state.source_names)
            .into_iter()
            .map(|((a, id), v)| ((lookup(a), id), v))
            .collect();
        state.targets = std::mem::take(&mut state.targets)
            .into_iter()
            .map(|((a, id), v)| ((lookup(a), id), v))
            .collect();
        debug!(count = remap.len(), "Mock adapters re-handled");
    }

    /// Flip the live HDR flag of a target without recording an operation.
    pub fn set_live_hdr(&self, adapter_id: AdapterId, target_id: u32, enabled: bool) {
        if let Some(t) = self.state.lock().unwrap().targets.get_mut(&(adapter_id, target_id)) {
            t.hdr_enabled = enabled;
        }
    }

    /// Change the live mode of a GDI device without recording an operation.
    pub fn set_live_device_mode(&self, device_name: &str, mode: LegacyDeviceMode) {
        self.state
            .lock()
            .unwrap()
            .device_modes
            .insert(device_name.to_string(), mode);
    }

    pub fn set_live_taskbar_option(&self, name: &str, value: u32) {
        self.state.lock().unwrap().taskbar_settings.set(name, value);
    }

    #[must_use]
    pub fn live_hdr(&self, adapter_id: AdapterId, target_id: u32) -> Option<bool> {
        self.state
            .lock()
            .unwrap()
            .targets
            .get(&(adapter_id, target_id))
            .map(|t| t.hdr_enabled)
    }

    #[must_use]
    pub fn live_device_mode(&self, device_name: &str) -> Option<LegacyDeviceMode> {
        self.state
            .lock()
            .unwrap()
            .device_modes
            .get(device_name)
            .cloned()
    }

    #[must_use]
    pub fn live_paths(&self) -> Vec<DisplayPath> {
        self.state.lock().unwrap().active.paths.clone()
    }

    #[must_use]
    pub fn stuck_rect(&self, device_path: &str) -> Option<StuckRect> {
        self.state
            .lock()
            .unwrap()
            .stuck_rects
            .get(device_path)
            .cloned()
    }

    // === Assertions ===

    /// Get all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.operation_log.lock().unwrap().clone()
    }

    /// Flags of every `set_config` call, in order.
    #[must_use]
    pub fn set_config_calls(&self) -> Vec<SetConfigFlags> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                Operation::SetConfig { flags, .. } => Some(flags),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded operations matching a predicate.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&Operation) -> bool) -> usize {
        self.operation_log
            .lock()
            .unwrap()
            .iter()
            .filter(|op| pred(op))
            .count()
    }

    /// Assert specific operations were performed.
    ///
    /// # Panics
    ///
    /// Panics if the operations don't match.
    pub fn assert_operations(&self, expected: &[Operation]) {
        let actual = self.operations();
        assert_eq!(
            actual, expected,
            "Operation mismatch.\nExpected: {expected:#?}\nActual: {actual:#?}",
        );
    }

    /// Assert a specific operation was performed at least once.
    ///
    /// # Panics
    ///
    /// Panics if the operation was not found.
    pub fn assert_contains(&self, expected: &Operation) {
        let ops = self.operations();
        assert!(
            ops.contains(expected),
            "Expected operation {expected:?} not found in: {ops:#?}",
        );
    }

    /// Clear the operation log for fresh assertions.
    pub fn clear_operations(&self) {
        self.operation_log.lock().unwrap().clear();
    }

    // === Internal Helpers ===

    fn record_op(&self, op: Operation) {
        trace!(?op, "Recording operation");
        self.operation_log.lock().unwrap().push(op);
    }

    fn check(&self, call: MockCall) -> NativeResult<()> {
        match self.failures.lock().unwrap().get(&call) {
            Some(status) => Err(*status),
            None => Ok(()),
        }
    }

    fn target<T>(
        &self,
        call: MockCall,
        adapter_id: AdapterId,
        target_id: u32,
        read: impl FnOnce(&MockTarget) -> T,
    ) -> NativeResult<T> {
        self.check(call)?;
        self.state
            .lock()
            .unwrap()
            .targets
            .get(&(adapter_id, target_id))
            .map(read)
            .ok_or(Win32Status::INVALID_PARAMETER)
    }
}

impl DisplayApi for MockPlatform {
    fn buffer_sizes(&self, selector: QuerySelector) -> NativeResult<BufferSizes> {
        self.check(MockCall::BufferSizes)?;
        let state = self.state.lock().unwrap();
        let extra = if selector.contains(QuerySelector::ALL_PATHS) {
            state.inactive_paths.len()
        } else {
            0
        };
        Ok(BufferSizes {
            paths: u32::try_from(state.active.paths.len() + extra).unwrap_or(u32::MAX),
            modes: u32::try_from(state.active.modes.len()).unwrap_or(u32::MAX),
        })
    }

    fn query_config(&self, selector: QuerySelector, _sizes: BufferSizes) -> NativeResult<Topology> {
        self.check(MockCall::QueryConfig)?;
        self.record_op(Operation::QueryConfig { selector });
        {
            let mut races = self.buffer_races.lock().unwrap();
            if *races > 0 {
                *races -= 1;
                return Err(Win32Status::INSUFFICIENT_BUFFER);
            }
        }
        let state = self.state.lock().unwrap();
        let mut topology = state.active.clone();
        if selector.contains(QuerySelector::ALL_PATHS) {
            topology.paths.extend(state.inactive_paths.iter().cloned());
        }
        Ok(topology)
    }

    fn source_name(&self, adapter_id: AdapterId, source_id: u32) -> NativeResult<String> {
        self.check(MockCall::SourceName)?;
        self.state
            .lock()
            .unwrap()
            .source_names
            .get(&(adapter_id, source_id))
            .cloned()
            .ok_or(Win32Status::INVALID_PARAMETER)
    }

    fn target_name(&self, adapter_id: AdapterId, target_id: u32) -> NativeResult<TargetDeviceName> {
        self.target(MockCall::TargetName, adapter_id, target_id, |t| t.name.clone())
    }

    fn adapter_name(&self, adapter_id: AdapterId) -> NativeResult<String> {
        self.check(MockCall::AdapterName)?;
        self.state
            .lock()
            .unwrap()
            .adapters
            .iter()
            .find(|(h, _)| *h == adapter_id)
            .map(|(_, p)| p.clone())
            .ok_or(Win32Status::INVALID_PARAMETER)
    }

    fn target_preferred_mode(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> NativeResult<TargetPreferredMode> {
        self.target(MockCall::TargetName, adapter_id, target_id, |t| {
            t.preferred.clone()
        })
    }

    fn advanced_color_info(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> NativeResult<AdvancedColorInfo> {
        self.target(MockCall::AdvancedColorInfo, adapter_id, target_id, |t| {
            AdvancedColorInfo {
                header: DeviceInfoHeader {
                    adapter_id,
                    id: target_id,
                },
                advanced_color_supported: t.hdr_supported,
                advanced_color_enabled: t.hdr_enabled,
                wide_color_enforced: false,
                advanced_color_force_disabled: false,
                color_encoding: 0,
                bits_per_color_channel: if t.hdr_enabled { 10 } else { 8 },
            }
        })
    }

    fn sdr_white_level(&self, adapter_id: AdapterId, target_id: u32) -> NativeResult<SdrWhiteLevel> {
        self.target(MockCall::SdrWhiteLevel, adapter_id, target_id, |t| {
            SdrWhiteLevel {
                header: DeviceInfoHeader {
                    adapter_id,
                    id: target_id,
                },
                level: t.white_level,
            }
        })
    }

    fn supports_virtual_resolution(&self, adapter_id: AdapterId, target_id: u32) -> NativeResult<bool> {
        self.target(MockCall::TargetName, adapter_id, target_id, |_| false)
    }

    fn target_base_type(&self, adapter_id: AdapterId, target_id: u32) -> NativeResult<OutputTechnology> {
        self.target(MockCall::TargetName, adapter_id, target_id, |t| {
            t.name.output_technology
        })
    }

    fn set_advanced_color(&self, adapter_id: AdapterId, target_id: u32, enable: bool) -> NativeResult<()> {
        self.check(MockCall::SetAdvancedColor)?;
        self.record_op(Operation::SetAdvancedColor {
            adapter_id,
            target_id,
            enable,
        });
        let mut state = self.state.lock().unwrap();
        let target = state
            .targets
            .get_mut(&(adapter_id, target_id))
            .ok_or(Win32Status::INVALID_PARAMETER)?;
        if !target.hdr_supported {
            return Err(Win32Status::NOT_SUPPORTED);
        }
        target.hdr_enabled = enable;
        Ok(())
    }

    fn set_config(
        &self,
        paths: &[DisplayPath],
        modes: &[DisplayMode],
        flags: SetConfigFlags,
    ) -> NativeResult<()> {
        self.record_op(Operation::SetConfig {
            flags,
            paths: paths.len(),
            modes: modes.len(),
        });
        let status = self
            .set_config_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Win32Status::SUCCESS);
        if !status.is_success() {
            debug!(%status, ?flags, "Mock rejecting configuration");
            return Err(status);
        }
        if flags.contains(SetConfigFlags::APPLY) {
            let mut state = self.state.lock().unwrap();
            state.active.paths = paths.to_vec();
            if !flags.contains(SetConfigFlags::TOPOLOGY_SUPPLIED) {
                state.active.modes = modes.to_vec();
            }
            debug!(paths = paths.len(), "Mock topology committed");
        }
        Ok(())
    }

    fn display_devices(&self) -> NativeResult<Vec<GdiDevice>> {
        self.check(MockCall::DisplayDevices)?;
        Ok(self.state.lock().unwrap().gdi_devices.clone())
    }

    fn current_device_mode(&self, device_name: &str) -> NativeResult<LegacyDeviceMode> {
        self.check(MockCall::CurrentDeviceMode)?;
        self.state
            .lock()
            .unwrap()
            .device_modes
            .get(device_name)
            .cloned()
            .ok_or(Win32Status::FILE_NOT_FOUND)
    }

    fn change_device_mode(&self, device_name: &str, mode: &LegacyDeviceMode) -> DispChange {
        self.record_op(Operation::ChangeDeviceMode {
            device_name: device_name.to_string(),
            mode: mode.clone(),
        });
        let result = self
            .device_mode_results
            .lock()
            .unwrap()
            .get(device_name)
            .copied()
            .unwrap_or(DispChange::Successful);
        if result.is_success() {
            self.state
                .lock()
                .unwrap()
                .device_modes
                .insert(device_name.to_string(), mode.clone());
        }
        result
    }
}

impl TaskbarApi for MockPlatform {
    fn read_stuck_rect(&self, device_path: &str) -> NativeResult<Option<StuckRect>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .stuck_rects
            .get(device_path)
            .cloned())
    }

    fn write_stuck_rect(&self, device_path: &str, rect: &StuckRect) -> NativeResult<()> {
        self.check(MockCall::WriteStuckRect)?;
        self.record_op(Operation::WriteStuckRect {
            device_path: device_path.to_string(),
            version: rect.version,
        });
        self.state
            .lock()
            .unwrap()
            .stuck_rects
            .insert(device_path.to_string(), rect.clone());
        Ok(())
    }

    fn reposition_main_taskbar(&self, edge: TaskbarEdge) -> NativeResult<()> {
        self.check(MockCall::RepositionMainTaskbar)?;
        self.record_op(Operation::RepositionMainTaskbar { edge });
        Ok(())
    }

    fn reposition_secondary_taskbars(&self) -> NativeResult<()> {
        self.record_op(Operation::RepositionSecondaryTaskbars);
        Ok(())
    }

    fn taskbar_settings(&self) -> NativeResult<TaskbarSettings> {
        self.check(MockCall::TaskbarSettings)?;
        Ok(self.state.lock().unwrap().taskbar_settings.clone())
    }

    fn apply_taskbar_settings(&self, settings: &TaskbarSettings) -> NativeResult<()> {
        self.check(MockCall::ApplyTaskbarSettings)?;
        self.record_op(Operation::ApplyTaskbarSettings);
        self.state.lock().unwrap().taskbar_settings = settings.clone();
        Ok(())
    }

    fn refresh_tray_area(&self) {
        self.record_op(Operation::RefreshTrayArea);
    }
}

/// Builder for creating a `MockPlatform` from simulated monitors.
#[derive(Debug, Default)]
pub struct MockPlatformBuilder {
    adapters: Vec<(AdapterId, String)>,
    displays: Vec<MockDisplay>,
    taskbar_settings: TaskbarSettings,
    stuck_rect_version: u32,
}

impl MockPlatformBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stuck_rect_version: 3,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn adapter(mut self, handle: AdapterId, device_path: impl Into<String>) -> Self {
        self.adapters.push((handle, device_path.into()));
        self
    }

    #[must_use]
    pub fn display(mut self, display: MockDisplay) -> Self {
        self.displays.push(display);
        self
    }

    #[must_use]
    pub fn taskbar_option(mut self, name: &str, value: u32) -> Self {
        self.taskbar_settings.set(name, value);
        self
    }

    /// Schema version of the generated stuck-rectangle blobs.
    #[must_use]
    pub fn stuck_rect_version(mut self, version: u32) -> Self {
        self.stuck_rect_version = version;
        self
    }

    #[must_use]
    pub fn build(self) -> MockPlatform {
        let mut state = MockState {
            adapters: self.adapters,
            taskbar_settings: self.taskbar_settings,
            ..MockState::default()
        };
        let mut source_modes: HashMap<(AdapterId, u32), u32> = HashMap::new();
        let mut primary_assigned = false;

        for display in &self.displays {
            let target = MockTarget {
                name: TargetDeviceName {
                    output_technology: display.output_technology,
                    edid_manufacturer_id: display.edid_manufacturer_id,
                    edid_product_code_id: display.edid_product_code_id,
                    connector_instance: display.source_id + 1,
                    friendly_name: display.friendly_name.clone(),
                    monitor_device_path: display.monitor_device_path.clone(),
                },
                preferred: TargetPreferredMode {
                    width: display.width,
                    height: display.height,
                    video_signal: video_signal(display),
                },
                hdr_supported: display.hdr.is_some(),
                hdr_enabled: display.hdr.unwrap_or(false),
                white_level: 1000,
            };
            state
                .targets
                .insert((display.adapter_id, display.target_id), target);
            state
                .source_names
                .insert((display.adapter_id, display.source_id), display.gdi_name.clone());

            if !display.active {
                state.inactive_paths.push(DisplayPath {
                    source: PathSource {
                        adapter_id: display.adapter_id,
                        id: display.source_id,
                        mode_info_idx: MODE_IDX_INVALID,
                        status_flags: 0,
                    },
                    target: path_target(display, MODE_IDX_INVALID),
                    flags: 0,
                });
                continue;
            }

            let source_idx = *source_modes
                .entry((display.adapter_id, display.source_id))
                .or_insert_with(|| {
                    state.active.modes.push(DisplayMode {
                        adapter_id: display.adapter_id,
                        id: display.source_id,
                        info: ModeInfo::Source(SourceMode {
                            width: display.width,
                            height: display.height,
                            pixel_format: 4,
                            position: display.position,
                        }),
                    });
                    u32::try_from(state.active.modes.len() - 1).unwrap_or(MODE_IDX_INVALID)
                });
            state.active.modes.push(DisplayMode {
                adapter_id: display.adapter_id,
                id: display.target_id,
                info: ModeInfo::Target {
                    video_signal: video_signal(display),
                },
            });
            let target_idx =
                u32::try_from(state.active.modes.len() - 1).unwrap_or(MODE_IDX_INVALID);

            state.active.paths.push(DisplayPath {
                source: PathSource {
                    adapter_id: display.adapter_id,
                    id: display.source_id,
                    mode_info_idx: source_idx,
                    status_flags: 1,
                },
                target: path_target(display, target_idx),
                flags: PATH_ACTIVE,
            });

            if !state.device_modes.contains_key(&display.gdi_name) {
                let mut flags = DeviceStateFlags::ATTACHED_TO_DESKTOP;
                if !primary_assigned {
                    flags |= DeviceStateFlags::PRIMARY_DEVICE;
                    primary_assigned = true;
                }
                let index = state.gdi_devices.len();
                state.gdi_devices.push(GdiDevice {
                    device_name: display.gdi_name.clone(),
                    device_string: "Mock Display Adapter".to_string(),
                    device_key: format!(
                        r"\Registry\Machine\System\CurrentControlSet\Control\Video\{{MOCK-{:x}}}\{index:04}",
                        display.adapter_id.0
                    ),
                    state_flags: flags,
                });
                state.device_modes.insert(
                    display.gdi_name.clone(),
                    LegacyDeviceMode {
                        bits_per_pixel: 32,
                        orientation: 0,
                        frequency: display.refresh_hz,
                        position: display.position,
                        width: display.width,
                        height: display.height,
                        display_flags: 0,
                    },
                );
            }

            if let Some(key) = crate::snapshot::fingerprint::taskbar_device_path(&format!(
                "WINAPI|#|#|#|#|{}|#",
                display.monitor_device_path
            )) {
                state.stuck_rects.insert(
                    key,
                    StuckRect {
                        version: self.stuck_rect_version,
                        binary: stuck_rect_blob(TaskbarEdge::Bottom, display),
                    },
                );
            }
        }

        if let Some(first) = self.displays.iter().find(|d| d.active) {
            state.stuck_rects.insert(
                MAIN_SCREEN_PATH.to_string(),
                StuckRect {
                    version: self.stuck_rect_version,
                    binary: stuck_rect_blob(TaskbarEdge::Bottom, first),
                },
            );
        }

        debug!(
            adapters = state.adapters.len(),
            paths = state.active.paths.len(),
            "Creating mock platform"
        );
        MockPlatform::from_state(state)
    }
}

fn path_target(display: &MockDisplay, mode_info_idx: u32) -> PathTarget {
    PathTarget {
        adapter_id: display.adapter_id,
        id: display.target_id,
        mode_info_idx,
        output_technology: display.output_technology,
        rotation: 1,
        scaling: 1,
        refresh_rate: Rational::new(display.refresh_hz * 1000, 1000),
        scan_line_ordering: 1,
        target_available: display.available,
        status_flags: 1,
    }
}

fn video_signal(display: &MockDisplay) -> VideoSignalInfo {
    VideoSignalInfo {
        pixel_rate: u64::from(display.width) * u64::from(display.height) * u64::from(display.refresh_hz),
        h_sync_freq: Rational::new(display.height * display.refresh_hz, 1),
        v_sync_freq: Rational::new(display.refresh_hz * 1000, 1000),
        active_size: Size2D {
            cx: display.width,
            cy: display.height,
        },
        total_size: Size2D {
            cx: display.width,
            cy: display.height,
        },
        video_standard: 255,
        scan_line_ordering: 1,
    }
}

fn stuck_rect_blob(edge: TaskbarEdge, display: &MockDisplay) -> Vec<u8> {
    let left = display.position.x;
    let right = left + i32::try_from(display.width).unwrap_or(i32::MAX);
    let bottom = display.position.y + i32::try_from(display.height).unwrap_or(i32::MAX);
    let top = bottom - 48;
    let mut blob = vec![0u8; 48];
    blob[0..4].copy_from_slice(&48u32.to_le_bytes());
    blob[4..8].copy_from_slice(&0xFFFF_FFFEu32.to_le_bytes());
    blob[8] = 0x02;
    blob[12..16].copy_from_slice(&edge.as_raw().to_le_bytes());
    for (i, v) in [left, top, right, bottom].iter().enumerate() {
        let at = 24 + i * 4;
        blob[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
    blob
}

impl MockDisplay {
    /// Mode kind helper used by tests that locate this display's modes.
    #[must_use]
    pub fn owns_mode(&self, mode: &DisplayMode) -> bool {
        mode.adapter_id == self.adapter_id
            && match mode.kind() {
                ModeKind::Source => mode.id == self.source_id,
                ModeKind::Target => mode.id == self.target_id,
                ModeKind::DesktopImage => false,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPU: AdapterId = AdapterId(0x1_0000_d2a1);

    fn two_screens() -> MockPlatform {
        MockPlatformBuilder::new()
            .adapter(GPU, r"\\?\PCI#VEN_10DE&DEV_2482#gpu0")
            .display(MockDisplay::new(GPU, 0, 4353).hdr(true))
            .display(MockDisplay::new(GPU, 1, 4354).at(1920, 0))
            .build()
    }

    #[test]
    fn test_builder_creates_topology() {
        let mock = two_screens();
        let sizes = mock.buffer_sizes(QuerySelector::active(true)).unwrap();
        assert_eq!(sizes.paths, 2);
        assert_eq!(sizes.modes, 4);

        let topo = mock.query_config(QuerySelector::active(true), sizes).unwrap();
        assert_eq!(topo.paths[1].target.id, 4354);
        assert_eq!(topo.paths[1].source.mode_info_idx, 2);
        assert_eq!(topo.paths[1].target.mode_info_idx, 3);
        assert_eq!(mock.display_devices().unwrap().len(), 2);
    }

    #[test]
    fn test_clone_shares_source_mode() {
        let mock = MockPlatformBuilder::new()
            .adapter(GPU, "gpu")
            .display(MockDisplay::new(GPU, 0, 100))
            .display(MockDisplay::new(GPU, 0, 200))
            .build();
        let topo = mock
            .query_config(QuerySelector::active(true), BufferSizes::default())
            .unwrap();
        assert_eq!(topo.modes.len(), 3);
        assert_eq!(topo.paths[0].source.mode_info_idx, topo.paths[1].source.mode_info_idx);
        assert_eq!(mock.display_devices().unwrap().len(), 1);
    }

    #[test]
    fn test_buffer_race_then_success() {
        let mock = two_screens();
        mock.race_buffers(1);
        let sizes = BufferSizes::default();
        assert_eq!(
            mock.query_config(QuerySelector::active(true), sizes),
            Err(Win32Status::INSUFFICIENT_BUFFER)
        );
        assert!(mock.query_config(QuerySelector::active(true), sizes).is_ok());
    }

    #[test]
    fn test_scripted_set_config() {
        let mock = two_screens();
        mock.queue_set_config_results([Win32Status::INVALID_PARAMETER]);
        let flags = SetConfigFlags::APPLY | SetConfigFlags::USE_SUPPLIED_DISPLAY_CONFIG;
        assert_eq!(mock.set_config(&[], &[], flags), Err(Win32Status::INVALID_PARAMETER));
        assert_eq!(mock.set_config(&[], &[], flags), Ok(()));
        assert_eq!(mock.set_config_calls(), vec![flags, flags]);
        assert!(mock.live_paths().is_empty());
    }

    #[test]
    fn test_hdr_state_follows_set() {
        let mock = two_screens();
        assert_eq!(mock.live_hdr(GPU, 4353), Some(true));
        mock.set_advanced_color(GPU, 4353, false).unwrap();
        assert_eq!(mock.live_hdr(GPU, 4353), Some(false));
        assert_eq!(
            mock.set_advanced_color(GPU, 4354, true),
            Err(Win32Status::NOT_SUPPORTED)
        );
    }

    #[test]
    fn test_failure_injection() {
        let mock = two_screens();
        mock.fail(MockCall::AdvancedColorInfo, Win32Status::GEN_FAILURE);
        assert_eq!(
            mock.advanced_color_info(GPU, 4353),
            Err(Win32Status::GEN_FAILURE)
        );
        mock.clear_failures();
        assert!(mock.advanced_color_info(GPU, 4353).is_ok());
    }

    #[test]
    fn test_rehandle_adapters() {
        let mock = two_screens();
        let new = AdapterId(0x2_0000_0001);
        mock.rehandle_adapters(&[(GPU, new)]);
        assert!(mock.adapter_name(GPU).is_err());
        assert!(mock.adapter_name(new).is_ok());
        assert!(mock.live_paths().iter().all(|p| p.target.adapter_id == new));
        assert_eq!(mock.live_hdr(new, 4353), Some(true));
    }

    #[test]
    fn test_stuck_rects_generated() {
        let mock = two_screens();
        assert!(mock.read_stuck_rect(MAIN_SCREEN_PATH).unwrap().is_some());
        assert!(
            mock.read_stuck_rect("MCK1101#5&1a2b3c4d&0&UID4353")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_owns_mode() {
        let display = MockDisplay::new(GPU, 0, 4353);
        let mock = MockPlatformBuilder::new().adapter(GPU, "gpu").display(display.clone()).build();
        let topo = mock
            .query_config(QuerySelector::active(true), BufferSizes::default())
            .unwrap();
        assert!(topo.modes.iter().all(|m| display.owns_mode(m)));
    }
}
