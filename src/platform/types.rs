//! Values returned by native queries that are not themselves persisted.

use serde::Serialize;

use super::flags::DeviceStateFlags;
use crate::snapshot::{DisplayMode, DisplayPath, OutputTechnology, VideoSignalInfo};

/// Element counts returned by `GetDisplayConfigBufferSizes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferSizes {
    pub paths: u32,
    pub modes: u32,
}

/// Paths and modes returned by one `QueryDisplayConfig` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    pub paths: Vec<DisplayPath>,
    pub modes: Vec<DisplayMode>,
}

/// Monitor identity reported for a target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TargetDeviceName {
    pub output_technology: OutputTechnology,
    pub edid_manufacturer_id: u16,
    pub edid_product_code_id: u16,
    pub connector_instance: u32,
    pub friendly_name: String,
    pub monitor_device_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TargetPreferredMode {
    pub width: u32,
    pub height: u32,
    pub video_signal: VideoSignalInfo,
}

/// One entry of the GDI display device enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GdiDevice {
    pub device_name: String,
    pub device_string: String,
    pub device_key: String,
    pub state_flags: DeviceStateFlags,
}
