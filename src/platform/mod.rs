//! Native display configuration layer.
//!
//! This module provides a trait-based abstraction over the Windows display
//! configuration stack and an in-memory mock, so every engine decision can be
//! exercised without a GPU attached.
//!
//! Each primitive returns a typed [`NativeResult`]: the raw status code is
//! preserved so the engine can decide what to retry, log or surface.

mod flags;
pub mod mock;
mod status;
mod types;
#[cfg(windows)]
mod win32;

pub use flags::{DeviceStateFlags, QuerySelector, SetConfigFlags};
pub use status::{DispChange, NativeResult, Win32Status};
pub use types::{BufferSizes, GdiDevice, TargetDeviceName, TargetPreferredMode, Topology};

use crate::error::{DprofError, Result};
use crate::snapshot::{
    AdapterId, AdvancedColorInfo, DisplayMode, DisplayPath, LegacyDeviceMode, OutputTechnology,
    SdrWhiteLevel, StuckRect, TaskbarEdge, TaskbarSettings,
};

/// Connecting-and-Configuring-Displays primitives plus the GDI per-device
/// settings interface.
///
/// # Implementation Notes
///
/// - Every call is synchronous and scoped; no native handle outlives it
/// - `query_config` reports a topology change between the size query and the
///   data query as `Win32Status::INSUFFICIENT_BUFFER`
/// - `set_config` ignores `modes` when `flags` carries `TOPOLOGY_SUPPLIED`
pub trait DisplayApi {
    /// Number of path and mode entries the next query may return.
    fn buffer_sizes(&self, selector: QuerySelector) -> NativeResult<BufferSizes>;

    /// Read paths and modes into buffers of the given size.
    fn query_config(&self, selector: QuerySelector, sizes: BufferSizes) -> NativeResult<Topology>;

    /// GDI device name (`\\.\DISPLAYn`) of a source.
    fn source_name(&self, adapter_id: AdapterId, source_id: u32) -> NativeResult<String>;

    fn target_name(&self, adapter_id: AdapterId, target_id: u32) -> NativeResult<TargetDeviceName>;

    /// Stable device path of an adapter.
    fn adapter_name(&self, adapter_id: AdapterId) -> NativeResult<String>;

    fn target_preferred_mode(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> NativeResult<TargetPreferredMode>;

    fn advanced_color_info(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> NativeResult<AdvancedColorInfo>;

    fn sdr_white_level(&self, adapter_id: AdapterId, target_id: u32) -> NativeResult<SdrWhiteLevel>;

    fn supports_virtual_resolution(&self, adapter_id: AdapterId, target_id: u32)
    -> NativeResult<bool>;

    /// Connector the target physically uses, as opposed to what it reports.
    fn target_base_type(&self, adapter_id: AdapterId, target_id: u32)
    -> NativeResult<OutputTechnology>;

    fn set_advanced_color(&self, adapter_id: AdapterId, target_id: u32, enable: bool)
    -> NativeResult<()>;

    /// Validate or commit a configuration.
    fn set_config(
        &self,
        paths: &[DisplayPath],
        modes: &[DisplayMode],
        flags: SetConfigFlags,
    ) -> NativeResult<()>;

    /// Enumerate GDI display devices.
    fn display_devices(&self) -> NativeResult<Vec<GdiDevice>>;

    /// Current mode of a GDI device.
    fn current_device_mode(&self, device_name: &str) -> NativeResult<LegacyDeviceMode>;

    /// Commit a GDI device mode and persist it in the registry.
    fn change_device_mode(&self, device_name: &str, mode: &LegacyDeviceMode) -> DispChange;
}

/// Shell taskbar placement and settings.
pub trait TaskbarApi {
    /// Read the stuck-rectangle blob for a monitor device path or
    /// [`MAIN_SCREEN_PATH`](crate::snapshot::MAIN_SCREEN_PATH).
    fn read_stuck_rect(&self, device_path: &str) -> NativeResult<Option<StuckRect>>;

    fn write_stuck_rect(&self, device_path: &str, rect: &StuckRect) -> NativeResult<()>;

    fn reposition_main_taskbar(&self, edge: TaskbarEdge) -> NativeResult<()>;

    fn reposition_secondary_taskbars(&self) -> NativeResult<()>;

    fn taskbar_settings(&self) -> NativeResult<TaskbarSettings>;

    fn apply_taskbar_settings(&self, settings: &TaskbarSettings) -> NativeResult<()>;

    /// Ask the shell to redraw the notification area.
    fn refresh_tray_area(&self);
}

/// Everything the engine needs from the host.
pub trait Platform: DisplayApi + TaskbarApi {}

impl<T: DisplayApi + TaskbarApi> Platform for T {}

#[cfg(windows)]
pub type NativePlatform = win32::WindowsPlatform;

#[cfg(not(windows))]
pub type NativePlatform = Unsupported;

/// Open the host's display stack.
pub fn native() -> Result<NativePlatform> {
    #[cfg(windows)]
    {
        Ok(win32::WindowsPlatform::new())
    }
    #[cfg(not(windows))]
    {
        Err(DprofError::UnsupportedPlatform)
    }
}

/// Placeholder platform on hosts without a native display stack.
///
/// It has no values; [`native`] never returns one.
#[cfg(not(windows))]
#[derive(Debug)]
pub enum Unsupported {}

#[cfg(not(windows))]
impl DisplayApi for Unsupported {
    fn buffer_sizes(&self, _: QuerySelector) -> NativeResult<BufferSizes> {
        match *self {}
    }
    fn query_config(&self, _: QuerySelector, _: BufferSizes) -> NativeResult<Topology> {
        match *self {}
    }
    fn source_name(&self, _: AdapterId, _: u32) -> NativeResult<String> {
        match *self {}
    }
    fn target_name(&self, _: AdapterId, _: u32) -> NativeResult<TargetDeviceName> {
        match *self {}
    }
    fn adapter_name(&self, _: AdapterId) -> NativeResult<String> {
        match *self {}
    }
    fn target_preferred_mode(&self, _: AdapterId, _: u32) -> NativeResult<TargetPreferredMode> {
        match *self {}
    }
    fn advanced_color_info(&self, _: AdapterId, _: u32) -> NativeResult<AdvancedColorInfo> {
        match *self {}
    }
    fn sdr_white_level(&self, _: AdapterId, _: u32) -> NativeResult<SdrWhiteLevel> {
        match *self {}
    }
    fn supports_virtual_resolution(&self, _: AdapterId, _: u32) -> NativeResult<bool> {
        match *self {}
    }
    fn target_base_type(&self, _: AdapterId, _: u32) -> NativeResult<OutputTechnology> {
        match *self {}
    }
    fn set_advanced_color(&self, _: AdapterId, _: u32, _: bool) -> NativeResult<()> {
        match *self {}
    }
    fn set_config(&self, _: &[DisplayPath], _: &[DisplayMode], _: SetConfigFlags) -> NativeResult<()> {
        match *self {}
    }
    fn display_devices(&self) -> NativeResult<Vec<GdiDevice>> {
        match *self {}
    }
    fn current_device_mode(&self, _: &str) -> NativeResult<LegacyDeviceMode> {
        match *self {}
    }
    fn change_device_mode(&self, _: &str, _: &LegacyDeviceMode) -> DispChange {
        match *self {}
    }
}

#[cfg(not(windows))]
impl TaskbarApi for Unsupported {
    fn read_stuck_rect(&self, _: &str) -> NativeResult<Option<StuckRect>> {
        match *self {}
    }
    fn write_stuck_rect(&self, _: &str, _: &StuckRect) -> NativeResult<()> {
        match *self {}
    }
    fn reposition_main_taskbar(&self, _: TaskbarEdge) -> NativeResult<()> {
        match *self {}
    }
    fn reposition_secondary_taskbars(&self) -> NativeResult<()> {
        match *self {}
    }
    fn taskbar_settings(&self) -> NativeResult<TaskbarSettings> {
        match *self {}
    }
    fn apply_taskbar_settings(&self, _: &TaskbarSettings) -> NativeResult<()> {
        match *self {}
    }
    fn refresh_tray_area(&self) {
        match *self {}
    }
}

/// Map a failed native call to a crate error.
pub(crate) fn native_err(step: &'static str) -> impl FnOnce(Win32Status) -> DprofError {
    move |status| DprofError::NativeCall { step, status }
}
