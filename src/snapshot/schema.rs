//! Snapshot data types for display topology persistence.
//!
//! These types mirror the native CCD (Connecting and Configuring Displays)
//! and GDI structures closely enough to be handed back to the OS unchanged,
//! while staying plain serde data so a snapshot survives a JSON round-trip
//! without loss.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::taskbar::{TaskbarLayoutRecord, TaskbarSettings};

/// Mode index value marking a path endpoint without a backing mode entry.
pub const MODE_IDX_INVALID: u32 = 0xFFFF_FFFF;

/// Path flag: the path is part of the active topology.
pub const PATH_ACTIVE: u32 = 0x0000_0001;

/// Volatile 64-bit adapter handle (an OS `LUID`), valid for one boot session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterId(pub u64);

impl AdapterId {
    /// Pack the two halves of a native `LUID`.
    #[must_use]
    pub const fn from_parts(low: u32, high: i32) -> Self {
        Self(((high as u32 as u64) << 32) | low as u64)
    }

    #[must_use]
    pub const fn low_part(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    #[must_use]
    pub const fn high_part(self) -> i32 {
        (self.0 >> 32) as u32 as i32
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Connector type of a display target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTechnology {
    #[default]
    Other,
    Hd15,
    SVideo,
    CompositeVideo,
    ComponentVideo,
    Dvi,
    Hdmi,
    Lvds,
    DJpn,
    Sdi,
    DisplayPortExternal,
    DisplayPortEmbedded,
    UdiExternal,
    UdiEmbedded,
    SdtvDongle,
    Miracast,
    IndirectWired,
    IndirectVirtual,
    DisplayPortUsbTunnel,
    Internal,
}

impl OutputTechnology {
    /// Decode the native `DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY` value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Hd15,
            1 => Self::SVideo,
            2 => Self::CompositeVideo,
            3 => Self::ComponentVideo,
            4 => Self::Dvi,
            5 => Self::Hdmi,
            6 => Self::Lvds,
            8 => Self::DJpn,
            9 => Self::Sdi,
            10 => Self::DisplayPortExternal,
            11 => Self::DisplayPortEmbedded,
            12 => Self::UdiExternal,
            13 => Self::UdiEmbedded,
            14 => Self::SdtvDongle,
            15 => Self::Miracast,
            16 => Self::IndirectWired,
            17 => Self::IndirectVirtual,
            18 => Self::DisplayPortUsbTunnel,
            0x8000_0000 => Self::Internal,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Other => 0xFFFF_FFFF,
            Self::Hd15 => 0,
            Self::SVideo => 1,
            Self::CompositeVideo => 2,
            Self::ComponentVideo => 3,
            Self::Dvi => 4,
            Self::Hdmi => 5,
            Self::Lvds => 6,
            Self::DJpn => 8,
            Self::Sdi => 9,
            Self::DisplayPortExternal => 10,
            Self::DisplayPortEmbedded => 11,
            Self::UdiExternal => 12,
            Self::UdiEmbedded => 13,
            Self::SdtvDongle => 14,
            Self::Miracast => 15,
            Self::IndirectWired => 16,
            Self::IndirectVirtual => 17,
            Self::DisplayPortUsbTunnel => 18,
            Self::Internal => 0x8000_0000,
        }
    }

    /// Whether the driver answers advanced-color (HDR) queries for this connector.
    ///
    /// Analog and legacy digital connectors reject the query outright.
    #[must_use]
    pub const fn supports_color_queries(self) -> bool {
        !matches!(
            self,
            Self::Hd15 | Self::SVideo | Self::CompositeVideo | Self::ComponentVideo | Self::Dvi
        )
    }

    /// Stable name used inside display fingerprints.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Other => "OTHER",
            Self::Hd15 => "HD15",
            Self::SVideo => "SVIDEO",
            Self::CompositeVideo => "COMPOSITE_VIDEO",
            Self::ComponentVideo => "COMPONENT_VIDEO",
            Self::Dvi => "DVI",
            Self::Hdmi => "HDMI",
            Self::Lvds => "LVDS",
            Self::DJpn => "D_JPN",
            Self::Sdi => "SDI",
            Self::DisplayPortExternal => "DISPLAYPORT_EXTERNAL",
            Self::DisplayPortEmbedded => "DISPLAYPORT_EMBEDDED",
            Self::UdiExternal => "UDI_EXTERNAL",
            Self::UdiEmbedded => "UDI_EMBEDDED",
            Self::SdtvDongle => "SDTVDONGLE",
            Self::Miracast => "MIRACAST",
            Self::IndirectWired => "INDIRECT_WIRED",
            Self::IndirectVirtual => "INDIRECT_VIRTUAL",
            Self::DisplayPortUsbTunnel => "DISPLAYPORT_USB_TUNNEL",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for OutputTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    #[must_use]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Value as a float, zero when the denominator is zero.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            f64::from(self.numerator) / f64::from(self.denominator)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size2D {
    pub cx: u32,
    pub cy: u32,
}

/// Source (GPU output) endpoint of a path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathSource {
    pub adapter_id: AdapterId,
    pub id: u32,
    pub mode_info_idx: u32,
    pub status_flags: u32,
}

/// Target (monitor) endpoint of a path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathTarget {
    pub adapter_id: AdapterId,
    pub id: u32,
    pub mode_info_idx: u32,
    pub output_technology: OutputTechnology,
    pub rotation: u32,
    pub scaling: u32,
    pub refresh_rate: Rational,
    pub scan_line_ordering: u32,
    pub target_available: bool,
    pub status_flags: u32,
}

/// One signal route from a GPU output to a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayPath {
    pub source: PathSource,
    pub target: PathTarget,
    pub flags: u32,
}

impl DisplayPath {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.flags & PATH_ACTIVE != 0
    }

    /// Mark the path as a clone member that is reapplied without a backing mode.
    pub fn mark_clone_member(&mut self) {
        self.flags |= PATH_ACTIVE;
        self.source.mode_info_idx = MODE_IDX_INVALID;
        self.target.mode_info_idx = MODE_IDX_INVALID;
    }
}

/// Which endpoint a mode entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Source,
    Target,
    DesktopImage,
}

impl ModeKind {
    /// Decode the native `DISPLAYCONFIG_MODE_INFO_TYPE` value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Source),
            2 => Some(Self::Target),
            3 => Some(Self::DesktopImage),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Source => 1,
            Self::Target => 2,
            Self::DesktopImage => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceMode {
    pub width: u32,
    pub height: u32,
    pub pixel_format: u32,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoSignalInfo {
    pub pixel_rate: u64,
    pub h_sync_freq: Rational,
    pub v_sync_freq: Rational,
    pub active_size: Size2D,
    pub total_size: Size2D,
    pub video_standard: u32,
    pub scan_line_ordering: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DesktopImageInfo {
    pub path_source_size: Point,
    pub desktop_image_region: Rect,
    pub desktop_image_clip: Rect,
}

/// Kind-specific payload of a mode entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeInfo {
    Source(SourceMode),
    Target { video_signal: VideoSignalInfo },
    DesktopImage(DesktopImageInfo),
}

/// Resolution/format description attached to one endpoint of a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMode {
    pub adapter_id: AdapterId,
    pub id: u32,
    pub info: ModeInfo,
}

impl DisplayMode {
    #[must_use]
    pub const fn kind(&self) -> ModeKind {
        match self.info {
            ModeInfo::Source(_) => ModeKind::Source,
            ModeInfo::Target { .. } => ModeKind::Target,
            ModeInfo::DesktopImage(_) => ModeKind::DesktopImage,
        }
    }
}

/// Header every `DisplayConfigGetDeviceInfo` packet carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfoHeader {
    pub adapter_id: AdapterId,
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdvancedColorInfo {
    pub header: DeviceInfoHeader,
    pub advanced_color_supported: bool,
    pub advanced_color_enabled: bool,
    pub wide_color_enforced: bool,
    pub advanced_color_force_disabled: bool,
    pub color_encoding: u32,
    pub bits_per_color_channel: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SdrWhiteLevel {
    pub header: DeviceInfoHeader,
    /// Multiplier of 80 nits, scaled by 1000.
    pub level: u32,
}

/// HDR state of one target.
///
/// The adapter handle lives in three places: the top level, the advanced
/// color query header and the SDR white level query header. They are only
/// ever rewritten together.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HdrState {
    pub adapter_id: AdapterId,
    pub target_id: u32,
    pub advanced_color: AdvancedColorInfo,
    pub sdr_white_level: SdrWhiteLevel,
}

impl HdrState {
    /// Set the adapter handle on all three occurrences.
    pub fn set_adapter(&mut self, adapter_id: AdapterId) {
        self.adapter_id = adapter_id;
        self.advanced_color.header.adapter_id = adapter_id;
        self.sdr_white_level.header.adapter_id = adapter_id;
    }

    /// True when all three adapter handle occurrences agree.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.advanced_color.header.adapter_id == self.adapter_id
            && self.sdr_white_level.header.adapter_id == self.adapter_id
    }
}

/// Device mode as exposed by the legacy per-device settings interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LegacyDeviceMode {
    pub bits_per_pixel: u32,
    pub orientation: u32,
    pub frequency: u32,
    pub position: Point,
    pub width: u32,
    pub height: u32,
    /// Scan-line flags (interlaced, grayscale).
    pub display_flags: u32,
}

impl LegacyDeviceMode {
    /// Copy the tracked fields of `saved` over a freshly read mode.
    ///
    /// Position and size stay as read: the topology commit owns them.
    #[must_use]
    pub fn overlay(&self, saved: &Self) -> Self {
        Self {
            bits_per_pixel: saved.bits_per_pixel,
            orientation: saved.orientation,
            frequency: saved.frequency,
            display_flags: saved.display_flags,
            ..self.clone()
        }
    }
}

/// Legacy per-device display setting, keyed by device key in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegacyDisplaySetting {
    /// GDI device name, e.g. `\\.\DISPLAY1`.
    pub device_name: String,
    pub device_key: String,
    pub device_string: String,
    pub is_enabled: bool,
    pub is_primary: bool,
    pub mode: LegacyDeviceMode,
}

/// One adapter table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterEntry {
    pub handle: AdapterId,
    pub device_path: String,
}

/// Adapter table in enumeration order, unique by handle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterTable {
    entries: Vec<AdapterEntry>,
}

impl AdapterTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handle; returns false if it was already present.
    pub fn insert(&mut self, handle: AdapterId, device_path: impl Into<String>) -> bool {
        if self.contains(handle) {
            return false;
        }
        self.entries.push(AdapterEntry {
            handle,
            device_path: device_path.into(),
        });
        true
    }

    #[must_use]
    pub fn contains(&self, handle: AdapterId) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    #[must_use]
    pub fn device_path(&self, handle: AdapterId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.device_path.as_str())
    }

    /// First handle enumerated with the given device path.
    #[must_use]
    pub fn handle_for_path(&self, device_path: &str) -> Option<AdapterId> {
        self.entries
            .iter()
            .find(|e| e.device_path == device_path)
            .map(|e| e.handle)
    }

    #[must_use]
    pub fn first(&self) -> Option<&AdapterEntry> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdapterEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(AdapterId, String)> for AdapterTable {
    fn from_iter<I: IntoIterator<Item = (AdapterId, String)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (handle, path) in iter {
            table.insert(handle, path);
        }
        table
    }
}

/// A captured display configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub adapters: AdapterTable,
    pub paths: Vec<DisplayPath>,
    pub modes: Vec<DisplayMode>,
    pub hdr_states: Vec<HdrState>,
    pub legacy_settings: BTreeMap<String, LegacyDisplaySetting>,
    pub fingerprints: Vec<String>,
    /// GDI source name to the indices of the paths it drives. Source ids
    /// repeat across adapters, so membership is recorded per path.
    pub source_groups: BTreeMap<String, Vec<usize>>,
    pub taskbar_layout: Vec<TaskbarLayoutRecord>,
    pub taskbar_settings: TaskbarSettings,
    pub is_cloned: bool,
}

impl Snapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any GDI source drives more than one path.
    #[must_use]
    pub fn has_clone_groups(&self) -> bool {
        self.source_groups.values().any(|paths| paths.len() > 1)
    }

    /// Indices of paths that belong to a clone group, in path order.
    #[must_use]
    pub fn clone_member_indices(&self) -> Vec<usize> {
        let mut members: Vec<usize> = self
            .source_groups
            .values()
            .filter(|paths| paths.len() > 1)
            .flatten()
            .copied()
            .filter(|&i| i < self.paths.len())
            .collect();
        members.sort_unstable();
        members.dedup();
        members
    }

    /// GDI source name of the path at `index`.
    #[must_use]
    pub fn source_name_of(&self, index: usize) -> Option<&str> {
        self.source_groups
            .iter()
            .find(|(_, paths)| paths.contains(&index))
            .map(|(name, _)| name.as_str())
    }

    /// Count of active paths.
    #[must_use]
    pub fn active_path_count(&self) -> usize {
        self.paths.iter().filter(|p| p.is_active()).count()
    }
}
