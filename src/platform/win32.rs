//! Windows display stack: CCD, GDI device settings, shell taskbar.
//!
//! Every call allocates its buffers locally and converts the native structs
//! into the plain snapshot types before returning.

#![allow(unsafe_code)]

use std::mem::size_of;

use tracing::{debug, trace, warn};
use windows::Win32::Devices::Display::{
    DISPLAYCONFIG_2DREGION, DISPLAYCONFIG_ADAPTER_NAME, DISPLAYCONFIG_DESKTOP_IMAGE_INFO,
    DISPLAYCONFIG_DEVICE_INFO_GET_ADAPTER_NAME, DISPLAYCONFIG_DEVICE_INFO_GET_ADVANCED_COLOR_INFO,
    DISPLAYCONFIG_DEVICE_INFO_GET_SDR_WHITE_LEVEL, DISPLAYCONFIG_DEVICE_INFO_GET_SOURCE_NAME,
    DISPLAYCONFIG_DEVICE_INFO_GET_SUPPORT_VIRTUAL_RESOLUTION,
    DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_BASE_TYPE, DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME,
    DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_PREFERRED_MODE, DISPLAYCONFIG_DEVICE_INFO_HEADER,
    DISPLAYCONFIG_DEVICE_INFO_SET_ADVANCED_COLOR_STATE, DISPLAYCONFIG_DEVICE_INFO_TYPE,
    DISPLAYCONFIG_GET_ADVANCED_COLOR_INFO, DISPLAYCONFIG_MODE_INFO, DISPLAYCONFIG_MODE_INFO_0,
    DISPLAYCONFIG_MODE_INFO_TYPE, DISPLAYCONFIG_PATH_INFO, DISPLAYCONFIG_PATH_SOURCE_INFO,
    DISPLAYCONFIG_PATH_SOURCE_INFO_0, DISPLAYCONFIG_PATH_TARGET_INFO,
    DISPLAYCONFIG_PATH_TARGET_INFO_0, DISPLAYCONFIG_PIXELFORMAT, DISPLAYCONFIG_RATIONAL,
    DISPLAYCONFIG_ROTATION, DISPLAYCONFIG_SCALING, DISPLAYCONFIG_SCANLINE_ORDERING,
    DISPLAYCONFIG_SDR_WHITE_LEVEL, DISPLAYCONFIG_SET_ADVANCED_COLOR_STATE,
    DISPLAYCONFIG_SOURCE_DEVICE_NAME, DISPLAYCONFIG_SOURCE_MODE,
    DISPLAYCONFIG_SUPPORT_VIRTUAL_RESOLUTION, DISPLAYCONFIG_TARGET_BASE_TYPE,
    DISPLAYCONFIG_TARGET_DEVICE_NAME, DISPLAYCONFIG_TARGET_MODE,
    DISPLAYCONFIG_TARGET_PREFERRED_MODE, DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY,
    DISPLAYCONFIG_VIDEO_SIGNAL_INFO, DISPLAYCONFIG_VIDEO_SIGNAL_INFO_0, DisplayConfigGetDeviceInfo,
    DisplayConfigSetDeviceInfo, GetDisplayConfigBufferSizes, QUERY_DISPLAY_CONFIG_FLAGS,
    QueryDisplayConfig, SET_DISPLAY_CONFIG_FLAGS, SetDisplayConfig,
};
use windows::Win32::Foundation::{
    BOOL, ERROR_FILE_NOT_FOUND, ERROR_SUCCESS, HWND, LPARAM, LUID, POINTL, RECTL, WIN32_ERROR,
    WPARAM,
};
use windows::Win32::Graphics::Gdi::{
    CDS_UPDATEREGISTRY, ChangeDisplaySettingsExW, DEVMODEW, DISPLAY_DEVICEW, DM_BITSPERPEL,
    DM_DISPLAYFLAGS, DM_DISPLAYFREQUENCY, DM_DISPLAYORIENTATION, DEVMODE_DISPLAY_ORIENTATION,
    ENUM_CURRENT_SETTINGS, EnumDisplayDevicesW, EnumDisplaySettingsW,
};
use windows::Win32::System::Registry::{
    HKEY, HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_BINARY, REG_DWORD, REG_SAM_FLAGS,
    REG_VALUE_TYPE, RegCloseKey, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowExW, FindWindowW, HWND_BROADCAST, SMTO_ABORTIFHUNG, SendMessageTimeoutW,
    WM_SETTINGCHANGE,
};
use windows::core::PCWSTR;

use super::{
    BufferSizes, DeviceStateFlags, DispChange, DisplayApi, GdiDevice, NativeResult,
    QuerySelector, SetConfigFlags, TargetDeviceName, TargetPreferredMode, TaskbarApi, Topology,
    Win32Status,
};
use crate::snapshot::{
    AdapterId, AdvancedColorInfo, DesktopImageInfo, DeviceInfoHeader, DisplayMode, DisplayPath,
    LegacyDeviceMode, MAIN_SCREEN_PATH, ModeInfo, ModeKind, OutputTechnology, PathSource,
    PathTarget, Point, Rational, Rect, SdrWhiteLevel, Size2D, SourceMode, StuckRect, TASKBAR_OPTIONS,
    TaskbarEdge, TaskbarSettings, VideoSignalInfo,
};

const EXPLORER_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Explorer";
const ADVANCED_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Explorer\Advanced";
const TRAY_SETTINGS: &str = "TraySettings";
const MESSAGE_TIMEOUT_MS: u32 = 3000;

const ADVANCED_COLOR_SUPPORTED: u32 = 0x1;
const ADVANCED_COLOR_ENABLED: u32 = 0x2;
const WIDE_COLOR_ENFORCED: u32 = 0x4;
const ADVANCED_COLOR_FORCE_DISABLED: u32 = 0x8;
const DISABLE_MONITOR_VIRTUAL_RESOLUTION: u32 = 0x1;

/// Display stack of the running Windows session.
#[derive(Debug, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

// === Conversions ===

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

fn win32(status: WIN32_ERROR) -> NativeResult<()> {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(Win32Status(status.0))
    }
}

#[allow(clippy::cast_sign_loss)]
fn long_status(status: i32) -> NativeResult<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(Win32Status(status as u32))
    }
}

fn luid(id: AdapterId) -> LUID {
    LUID {
        LowPart: id.low_part(),
        HighPart: id.high_part(),
    }
}

fn adapter(l: LUID) -> AdapterId {
    AdapterId::from_parts(l.LowPart, l.HighPart)
}

#[allow(clippy::cast_sign_loss)]
fn tech(raw: DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY) -> OutputTechnology {
    OutputTechnology::from_raw(raw.0 as u32)
}

fn rational(r: DISPLAYCONFIG_RATIONAL) -> Rational {
    Rational::new(r.Numerator, r.Denominator)
}

fn native_rational(r: Rational) -> DISPLAYCONFIG_RATIONAL {
    DISPLAYCONFIG_RATIONAL {
        Numerator: r.numerator,
        Denominator: r.denominator,
    }
}

const fn point(p: POINTL) -> Point {
    Point { x: p.x, y: p.y }
}

const fn rect(r: RECTL) -> Rect {
    Rect {
        left: r.left,
        top: r.top,
        right: r.right,
        bottom: r.bottom,
    }
}

#[allow(clippy::cast_sign_loss)]
fn video_signal(v: &DISPLAYCONFIG_VIDEO_SIGNAL_INFO) -> VideoSignalInfo {
    VideoSignalInfo {
        pixel_rate: v.pixelRate,
        h_sync_freq: rational(v.hSyncFreq),
        v_sync_freq: rational(v.vSyncFreq),
        active_size: Size2D {
            cx: v.activeSize.cx,
            cy: v.activeSize.cy,
        },
        total_size: Size2D {
            cx: v.totalSize.cx,
            cy: v.totalSize.cy,
        },
        // SAFETY: both union members are plain u32 views of the same word.
        video_standard: unsafe { v.Anonymous.videoStandard },
        scan_line_ordering: v.scanLineOrdering.0 as u32,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn native_video_signal(v: &VideoSignalInfo) -> DISPLAYCONFIG_VIDEO_SIGNAL_INFO {
    DISPLAYCONFIG_VIDEO_SIGNAL_INFO {
        pixelRate: v.pixel_rate,
        hSyncFreq: native_rational(v.h_sync_freq),
        vSyncFreq: native_rational(v.v_sync_freq),
        activeSize: DISPLAYCONFIG_2DREGION {
            cx: v.active_size.cx,
            cy: v.active_size.cy,
        },
        totalSize: DISPLAYCONFIG_2DREGION {
            cx: v.total_size.cx,
            cy: v.total_size.cy,
        },
        Anonymous: DISPLAYCONFIG_VIDEO_SIGNAL_INFO_0 {
            videoStandard: v.video_standard,
        },
        scanLineOrdering: DISPLAYCONFIG_SCANLINE_ORDERING(v.scan_line_ordering as i32),
    }
}

#[allow(clippy::cast_sign_loss)]
fn path_from_native(p: &DISPLAYCONFIG_PATH_INFO) -> DisplayPath {
    let s = &p.sourceInfo;
    let t = &p.targetInfo;
    DisplayPath {
        source: PathSource {
            adapter_id: adapter(s.adapterId),
            id: s.id,
            // SAFETY: without virtual-mode awareness the union holds the plain index.
            mode_info_idx: unsafe { s.Anonymous.modeInfoIdx },
            status_flags: s.statusFlags,
        },
        target: PathTarget {
            adapter_id: adapter(t.adapterId),
            id: t.id,
            // SAFETY: as above.
            mode_info_idx: unsafe { t.Anonymous.modeInfoIdx },
            output_technology: tech(t.outputTechnology),
            rotation: t.rotation.0 as u32,
            scaling: t.scaling.0 as u32,
            refresh_rate: rational(t.refreshRate),
            scan_line_ordering: t.scanLineOrdering.0 as u32,
            target_available: t.targetAvailable.as_bool(),
            status_flags: t.statusFlags,
        },
        flags: p.flags,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn path_to_native(p: &DisplayPath) -> DISPLAYCONFIG_PATH_INFO {
    DISPLAYCONFIG_PATH_INFO {
        sourceInfo: DISPLAYCONFIG_PATH_SOURCE_INFO {
            adapterId: luid(p.source.adapter_id),
            id: p.source.id,
            Anonymous: DISPLAYCONFIG_PATH_SOURCE_INFO_0 {
                modeInfoIdx: p.source.mode_info_idx,
            },
            statusFlags: p.source.status_flags,
        },
        targetInfo: DISPLAYCONFIG_PATH_TARGET_INFO {
            adapterId: luid(p.target.adapter_id),
            id: p.target.id,
            Anonymous: DISPLAYCONFIG_PATH_TARGET_INFO_0 {
                modeInfoIdx: p.target.mode_info_idx,
            },
            outputTechnology: DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY(
                p.target.output_technology.as_raw() as i32,
            ),
            rotation: DISPLAYCONFIG_ROTATION(p.target.rotation as i32),
            scaling: DISPLAYCONFIG_SCALING(p.target.scaling as i32),
            refreshRate: native_rational(p.target.refresh_rate),
            scanLineOrdering: DISPLAYCONFIG_SCANLINE_ORDERING(p.target.scan_line_ordering as i32),
            targetAvailable: BOOL::from(p.target.target_available),
            statusFlags: p.target.status_flags,
        },
        flags: p.flags,
    }
}

#[allow(clippy::cast_sign_loss)]
fn mode_from_native(m: &DISPLAYCONFIG_MODE_INFO) -> Option<DisplayMode> {
    let info = match ModeKind::from_raw(m.infoType.0)? {
        ModeKind::Source => {
            // SAFETY: the tag says this is a source mode.
            let s = unsafe { &m.Anonymous.sourceMode };
            ModeInfo::Source(SourceMode {
                width: s.width,
                height: s.height,
                pixel_format: s.pixelFormat.0 as u32,
                position: point(s.position),
            })
        }
        ModeKind::Target => {
            // SAFETY: the tag says this is a target mode.
            let t = unsafe { &m.Anonymous.targetMode };
            ModeInfo::Target {
                video_signal: video_signal(&t.targetVideoSignalInfo),
            }
        }
        ModeKind::DesktopImage => {
            // SAFETY: the tag says this is a desktop image.
            let d = unsafe { &m.Anonymous.desktopImageInfo };
            ModeInfo::DesktopImage(DesktopImageInfo {
                path_source_size: point(d.PathSourceSize),
                desktop_image_region: rect(d.DesktopImageRegion),
                desktop_image_clip: rect(d.DesktopImageClip),
            })
        }
    };
    Some(DisplayMode {
        adapter_id: adapter(m.adapterId),
        id: m.id,
        info,
    })
}

const fn native_point(p: Point) -> POINTL {
    POINTL { x: p.x, y: p.y }
}

const fn native_rect(r: Rect) -> RECTL {
    RECTL {
        left: r.left,
        top: r.top,
        right: r.right,
        bottom: r.bottom,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn mode_to_native(m: &DisplayMode) -> DISPLAYCONFIG_MODE_INFO {
    let payload = match &m.info {
        ModeInfo::Source(s) => DISPLAYCONFIG_MODE_INFO_0 {
            sourceMode: DISPLAYCONFIG_SOURCE_MODE {
                width: s.width,
                height: s.height,
                pixelFormat: DISPLAYCONFIG_PIXELFORMAT(s.pixel_format as i32),
                position: native_point(s.position),
            },
        },
        ModeInfo::Target { video_signal } => DISPLAYCONFIG_MODE_INFO_0 {
            targetMode: DISPLAYCONFIG_TARGET_MODE {
                targetVideoSignalInfo: native_video_signal(video_signal),
            },
        },
        ModeInfo::DesktopImage(d) => DISPLAYCONFIG_MODE_INFO_0 {
            desktopImageInfo: DISPLAYCONFIG_DESKTOP_IMAGE_INFO {
                PathSourceSize: native_point(d.path_source_size),
                DesktopImageRegion: native_rect(d.desktop_image_region),
                DesktopImageClip: native_rect(d.desktop_image_clip),
            },
        },
    };
    DISPLAYCONFIG_MODE_INFO {
        infoType: DISPLAYCONFIG_MODE_INFO_TYPE(m.kind().as_raw()),
        id: m.id,
        adapterId: luid(m.adapter_id),
        Anonymous: payload,
    }
}

// === Device info packets ===

/// A `DisplayConfigGetDeviceInfo` packet: a header followed by a payload.
trait DeviceInfoPacket: Default {
    const KIND: DISPLAYCONFIG_DEVICE_INFO_TYPE;
    fn header_mut(&mut self) -> &mut DISPLAYCONFIG_DEVICE_INFO_HEADER;
}

macro_rules! device_info_packet {
    ($ty:ty, $kind:expr) => {
        impl DeviceInfoPacket for $ty {
            const KIND: DISPLAYCONFIG_DEVICE_INFO_TYPE = $kind;
            fn header_mut(&mut self) -> &mut DISPLAYCONFIG_DEVICE_INFO_HEADER {
                &mut self.header
            }
        }
    };
}

device_info_packet!(DISPLAYCONFIG_SOURCE_DEVICE_NAME, DISPLAYCONFIG_DEVICE_INFO_GET_SOURCE_NAME);
device_info_packet!(DISPLAYCONFIG_TARGET_DEVICE_NAME, DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME);
device_info_packet!(DISPLAYCONFIG_ADAPTER_NAME, DISPLAYCONFIG_DEVICE_INFO_GET_ADAPTER_NAME);
device_info_packet!(
    DISPLAYCONFIG_TARGET_PREFERRED_MODE,
    DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_PREFERRED_MODE
);
device_info_packet!(
    DISPLAYCONFIG_GET_ADVANCED_COLOR_INFO,
    DISPLAYCONFIG_DEVICE_INFO_GET_ADVANCED_COLOR_INFO
);
device_info_packet!(DISPLAYCONFIG_SDR_WHITE_LEVEL, DISPLAYCONFIG_DEVICE_INFO_GET_SDR_WHITE_LEVEL);
device_info_packet!(
    DISPLAYCONFIG_SUPPORT_VIRTUAL_RESOLUTION,
    DISPLAYCONFIG_DEVICE_INFO_GET_SUPPORT_VIRTUAL_RESOLUTION
);
device_info_packet!(DISPLAYCONFIG_TARGET_BASE_TYPE, DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_BASE_TYPE);
device_info_packet!(
    DISPLAYCONFIG_SET_ADVANCED_COLOR_STATE,
    DISPLAYCONFIG_DEVICE_INFO_SET_ADVANCED_COLOR_STATE
);

fn packet<T: DeviceInfoPacket>(adapter_id: AdapterId, id: u32) -> T {
    let mut packet = T::default();
    let header = packet.header_mut();
    header.r#type = T::KIND;
    header.size = u32::try_from(size_of::<T>()).unwrap_or(u32::MAX);
    header.adapterId = luid(adapter_id);
    header.id = id;
    packet
}

fn get_info<T: DeviceInfoPacket>(adapter_id: AdapterId, id: u32) -> NativeResult<T> {
    let mut request = packet::<T>(adapter_id, id);
    // SAFETY: every packet type is repr(C) and starts with its header; the
    // header's size field covers the whole packet.
    let status = unsafe {
        DisplayConfigGetDeviceInfo((&raw mut request).cast::<DISPLAYCONFIG_DEVICE_INFO_HEADER>())
    };
    trace!(kind = T::KIND.0, id, status, "DisplayConfigGetDeviceInfo");
    long_status(status)?;
    Ok(request)
}

fn header(adapter_id: AdapterId, id: u32) -> DeviceInfoHeader {
    DeviceInfoHeader { adapter_id, id }
}

// === Registry ===

struct RegKey(HKEY);

impl RegKey {
    fn open(path: &str, access: REG_SAM_FLAGS) -> NativeResult<Self> {
        let path = wide(path);
        let mut key = HKEY::default();
        // SAFETY: `path` is NUL-terminated and outlives the call.
        let status = unsafe {
            RegOpenKeyExW(HKEY_CURRENT_USER, PCWSTR(path.as_ptr()), 0, access, &raw mut key)
        };
        win32(status)?;
        Ok(Self(key))
    }

    fn read(&self, name: &str) -> NativeResult<Option<(REG_VALUE_TYPE, Vec<u8>)>> {
        let name = wide(name);
        let mut kind = REG_VALUE_TYPE::default();
        let mut len = 0u32;
        // SAFETY: size probe with no data buffer.
        let status = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR(name.as_ptr()),
                None,
                Some(&raw mut kind),
                None,
                Some(&raw mut len),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        win32(status)?;

        let mut data = vec![0u8; len as usize];
        // SAFETY: `data` holds `len` bytes.
        let status = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR(name.as_ptr()),
                None,
                Some(&raw mut kind),
                Some(data.as_mut_ptr()),
                Some(&raw mut len),
            )
        };
        win32(status)?;
        data.truncate(len as usize);
        Ok(Some((kind, data)))
    }

    fn write(&self, name: &str, kind: REG_VALUE_TYPE, data: &[u8]) -> NativeResult<()> {
        let name = wide(name);
        // SAFETY: `name` is NUL-terminated; `data` is borrowed for the call.
        let status = unsafe { RegSetValueExW(self.0, PCWSTR(name.as_ptr()), 0, kind, Some(data)) };
        win32(status)
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        // SAFETY: the key was opened by `RegKey::open`.
        let _ = unsafe { RegCloseKey(self.0) };
    }
}

/// Registry location of a stuck-rectangle record for a schema version.
fn stuck_rect_location(device_path: &str, version: u32) -> (String, &str) {
    if device_path == MAIN_SCREEN_PATH {
        (format!(r"{EXPLORER_KEY}\StuckRects{version}"), MAIN_SCREEN_PATH)
    } else {
        (format!(r"{EXPLORER_KEY}\MMStuckRects{version}"), device_path)
    }
}

fn broadcast_tray_settings(hwnd: HWND) -> NativeResult<()> {
    let text = wide(TRAY_SETTINGS);
    let mut result = 0usize;
    // SAFETY: `text` is NUL-terminated and outlives the synchronous call.
    let sent = unsafe {
        SendMessageTimeoutW(
            hwnd,
            WM_SETTINGCHANGE,
            WPARAM(0),
            LPARAM(text.as_ptr() as isize),
            SMTO_ABORTIFHUNG,
            MESSAGE_TIMEOUT_MS,
            Some(&raw mut result),
        )
    };
    if sent.0 == 0 {
        return Err(Win32Status::GEN_FAILURE);
    }
    Ok(())
}

fn find_window(class: &str) -> Option<HWND> {
    let class = wide(class);
    // SAFETY: `class` is NUL-terminated.
    unsafe { FindWindowW(PCWSTR(class.as_ptr()), PCWSTR::null()) }.ok()
}

// === Trait implementations ===

impl DisplayApi for WindowsPlatform {
    fn buffer_sizes(&self, selector: QuerySelector) -> NativeResult<BufferSizes> {
        let mut sizes = BufferSizes::default();
        // SAFETY: both out-pointers reference live locals.
        let status = unsafe {
            GetDisplayConfigBufferSizes(
                QUERY_DISPLAY_CONFIG_FLAGS(selector.bits()),
                &raw mut sizes.paths,
                &raw mut sizes.modes,
            )
        };
        trace!(?selector, status = status.0, "GetDisplayConfigBufferSizes");
        win32(status)?;
        Ok(sizes)
    }

    fn query_config(&self, selector: QuerySelector, sizes: BufferSizes) -> NativeResult<Topology> {
        let mut path_count = sizes.paths;
        let mut mode_count = sizes.modes;
        let mut paths = vec![DISPLAYCONFIG_PATH_INFO::default(); path_count as usize];
        let mut modes = vec![DISPLAYCONFIG_MODE_INFO::default(); mode_count as usize];
        // SAFETY: the buffers hold exactly the element counts passed in.
        let status = unsafe {
            QueryDisplayConfig(
                QUERY_DISPLAY_CONFIG_FLAGS(selector.bits()),
                &raw mut path_count,
                paths.as_mut_ptr(),
                &raw mut mode_count,
                modes.as_mut_ptr(),
                None,
            )
        };
        trace!(?selector, status = status.0, path_count, mode_count, "QueryDisplayConfig");
        win32(status)?;
        paths.truncate(path_count as usize);
        modes.truncate(mode_count as usize);

        Ok(Topology {
            paths: paths.iter().map(path_from_native).collect(),
            modes: modes.iter().filter_map(mode_from_native).collect(),
        })
    }

    fn source_name(&self, adapter_id: AdapterId, source_id: u32) -> NativeResult<String> {
        let info: DISPLAYCONFIG_SOURCE_DEVICE_NAME = get_info(adapter_id, source_id)?;
        Ok(from_wide(&info.viewGdiDeviceName))
    }

    fn target_name(&self, adapter_id: AdapterId, target_id: u32) -> NativeResult<TargetDeviceName> {
        let info: DISPLAYCONFIG_TARGET_DEVICE_NAME = get_info(adapter_id, target_id)?;
        Ok(TargetDeviceName {
            output_technology: tech(info.outputTechnology),
            edid_manufacturer_id: info.edidManufactureId,
            edid_product_code_id: info.edidProductCodeId,
            connector_instance: info.connectorInstance,
            friendly_name: from_wide(&info.monitorFriendlyDeviceName),
            monitor_device_path: from_wide(&info.monitorDevicePath),
        })
    }

    fn adapter_name(&self, adapter_id: AdapterId) -> NativeResult<String> {
        let info: DISPLAYCONFIG_ADAPTER_NAME = get_info(adapter_id, 0)?;
        Ok(from_wide(&info.adapterDevicePath))
    }

    fn target_preferred_mode(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> NativeResult<TargetPreferredMode> {
        let info: DISPLAYCONFIG_TARGET_PREFERRED_MODE = get_info(adapter_id, target_id)?;
        Ok(TargetPreferredMode {
            width: info.width,
            height: info.height,
            video_signal: video_signal(&info.targetMode.targetVideoSignalInfo),
        })
    }

    #[allow(clippy::cast_sign_loss)]
    fn advanced_color_info(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> NativeResult<AdvancedColorInfo> {
        let info: DISPLAYCONFIG_GET_ADVANCED_COLOR_INFO = get_info(adapter_id, target_id)?;
        // SAFETY: the bitfield struct and `value` are views of the same u32.
        let bits = unsafe { info.Anonymous.value };
        Ok(AdvancedColorInfo {
            header: header(adapter_id, target_id),
            advanced_color_supported: bits & ADVANCED_COLOR_SUPPORTED != 0,
            advanced_color_enabled: bits & ADVANCED_COLOR_ENABLED != 0,
            wide_color_enforced: bits & WIDE_COLOR_ENFORCED != 0,
            advanced_color_force_disabled: bits & ADVANCED_COLOR_FORCE_DISABLED != 0,
            color_encoding: info.colorEncoding.0 as u32,
            bits_per_color_channel: info.bitsPerColorChannel,
        })
    }

    fn sdr_white_level(&self, adapter_id: AdapterId, target_id: u32) -> NativeResult<SdrWhiteLevel> {
        let info: DISPLAYCONFIG_SDR_WHITE_LEVEL = get_info(adapter_id, target_id)?;
        Ok(SdrWhiteLevel {
            header: header(adapter_id, target_id),
            level: info.SDRWhiteLevel,
        })
    }

    fn supports_virtual_resolution(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> NativeResult<bool> {
        let info: DISPLAYCONFIG_SUPPORT_VIRTUAL_RESOLUTION = get_info(adapter_id, target_id)?;
        // SAFETY: the bitfield struct and `value` are views of the same u32.
        let bits = unsafe { info.Anonymous.value };
        Ok(bits & DISABLE_MONITOR_VIRTUAL_RESOLUTION == 0)
    }

    fn target_base_type(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> NativeResult<OutputTechnology> {
        let info: DISPLAYCONFIG_TARGET_BASE_TYPE = get_info(adapter_id, target_id)?;
        Ok(tech(info.baseOutputTechnology))
    }

    fn set_advanced_color(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
        enable: bool,
    ) -> NativeResult<()> {
        let mut request = packet::<DISPLAYCONFIG_SET_ADVANCED_COLOR_STATE>(adapter_id, target_id);
        request.Anonymous.value = u32::from(enable);
        // SAFETY: packet layout as in `get_info`; the OS only reads it.
        let status = unsafe {
            DisplayConfigSetDeviceInfo((&raw const request).cast::<DISPLAYCONFIG_DEVICE_INFO_HEADER>())
        };
        debug!(%adapter_id, target_id, enable, status, "DisplayConfigSetDeviceInfo");
        long_status(status)
    }

    fn set_config(
        &self,
        paths: &[DisplayPath],
        modes: &[DisplayMode],
        flags: SetConfigFlags,
    ) -> NativeResult<()> {
        let native_paths: Vec<DISPLAYCONFIG_PATH_INFO> = paths.iter().map(path_to_native).collect();
        let native_modes: Vec<DISPLAYCONFIG_MODE_INFO> = modes.iter().map(mode_to_native).collect();
        let modes_arg = if flags.contains(SetConfigFlags::TOPOLOGY_SUPPLIED) {
            None
        } else {
            Some(native_modes.as_slice())
        };
        // SAFETY: slices are borrowed for the duration of the call.
        let status = unsafe {
            SetDisplayConfig(
                Some(native_paths.as_slice()),
                modes_arg,
                SET_DISPLAY_CONFIG_FLAGS(flags.bits()),
            )
        };
        debug!(?flags, paths = paths.len(), modes = modes.len(), status, "SetDisplayConfig");
        long_status(status)
    }

    fn display_devices(&self) -> NativeResult<Vec<GdiDevice>> {
        let mut devices = Vec::new();
        for index in 0.. {
            let mut device = DISPLAY_DEVICEW {
                cb: u32::try_from(size_of::<DISPLAY_DEVICEW>()).unwrap_or(u32::MAX),
                ..Default::default()
            };
            // SAFETY: `device.cb` is set to the struct size.
            let found = unsafe { EnumDisplayDevicesW(PCWSTR::null(), index, &raw mut device, 0) };
            if !found.as_bool() {
                break;
            }
            devices.push(GdiDevice {
                device_name: from_wide(&device.DeviceName),
                device_string: from_wide(&device.DeviceString),
                device_key: from_wide(&device.DeviceKey),
                state_flags: DeviceStateFlags::from_bits_retain(device.StateFlags.0),
            });
        }
        trace!(count = devices.len(), "EnumDisplayDevicesW");
        Ok(devices)
    }

    fn current_device_mode(&self, device_name: &str) -> NativeResult<LegacyDeviceMode> {
        read_devmode(device_name).map(|mode| legacy_mode(&mode))
    }

    fn change_device_mode(&self, device_name: &str, mode: &LegacyDeviceMode) -> DispChange {
        // Re-read so fields outside `LegacyDeviceMode` go back unchanged.
        let mut native = match read_devmode(device_name) {
            Ok(native) => native,
            Err(status) => {
                warn!(device = %device_name, %status, "Failed to re-read device mode");
                return DispChange::Failed;
            }
        };
        overlay_devmode(&mut native, mode);

        let name = wide(device_name);
        // SAFETY: `name` and `native` outlive the call.
        let result = unsafe {
            ChangeDisplaySettingsExW(
                PCWSTR(name.as_ptr()),
                Some(&raw const native),
                HWND::default(),
                CDS_UPDATEREGISTRY,
                None,
            )
        };
        let result = DispChange::from_raw(result.0);
        debug!(device = %device_name, %result, "ChangeDisplaySettingsExW");
        result
    }
}

fn read_devmode(device_name: &str) -> NativeResult<DEVMODEW> {
    let name = wide(device_name);
    let mut mode = DEVMODEW {
        dmSize: u16::try_from(size_of::<DEVMODEW>()).unwrap_or(u16::MAX),
        ..Default::default()
    };
    // SAFETY: `name` is NUL-terminated; `dmSize` is set.
    let ok = unsafe {
        EnumDisplaySettingsW(PCWSTR(name.as_ptr()), ENUM_CURRENT_SETTINGS, &raw mut mode)
    };
    if !ok.as_bool() {
        return Err(Win32Status::FILE_NOT_FOUND);
    }
    Ok(mode)
}

fn legacy_mode(mode: &DEVMODEW) -> LegacyDeviceMode {
    // SAFETY: display devices fill the display arm of both unions.
    let (position, orientation, display_flags) = unsafe {
        (
            mode.Anonymous1.Anonymous2.dmPosition,
            mode.Anonymous1.Anonymous2.dmDisplayOrientation.0,
            mode.Anonymous2.dmDisplayFlags,
        )
    };
    LegacyDeviceMode {
        bits_per_pixel: mode.dmBitsPerPel,
        orientation,
        frequency: mode.dmDisplayFrequency,
        position: point(position),
        width: mode.dmPelsWidth,
        height: mode.dmPelsHeight,
        display_flags,
    }
}

/// Write the restorable fields of `mode` into a freshly read `DEVMODEW`.
///
/// Position and size stay as read: the topology commit owns them.
fn overlay_devmode(native: &mut DEVMODEW, mode: &LegacyDeviceMode) {
    native.dmFields = native.dmFields
        | DM_BITSPERPEL
        | DM_DISPLAYFREQUENCY
        | DM_DISPLAYORIENTATION
        | DM_DISPLAYFLAGS;
    native.dmBitsPerPel = mode.bits_per_pixel;
    native.dmDisplayFrequency = mode.frequency;
    native.Anonymous1.Anonymous2.dmDisplayOrientation =
        DEVMODE_DISPLAY_ORIENTATION(mode.orientation);
    native.Anonymous2.dmDisplayFlags = mode.display_flags;
}

impl TaskbarApi for WindowsPlatform {
    fn read_stuck_rect(&self, device_path: &str) -> NativeResult<Option<StuckRect>> {
        for version in [3, 2] {
            let (key_path, value) = stuck_rect_location(device_path, version);
            let key = match RegKey::open(&key_path, KEY_READ) {
                Ok(key) => key,
                Err(Win32Status::FILE_NOT_FOUND) => continue,
                Err(status) => return Err(status),
            };
            if let Some((_, binary)) = key.read(value)? {
                trace!(%device_path, version, bytes = binary.len(), "Read stuck rectangle");
                return Ok(Some(StuckRect { version, binary }));
            }
        }
        Ok(None)
    }

    fn write_stuck_rect(&self, device_path: &str, rect: &StuckRect) -> NativeResult<()> {
        let (key_path, value) = stuck_rect_location(device_path, rect.version);
        let key = RegKey::open(&key_path, KEY_WRITE)?;
        key.write(value, REG_BINARY, &rect.binary)?;
        debug!(%device_path, version = rect.version, "Wrote stuck rectangle");
        Ok(())
    }

    fn reposition_main_taskbar(&self, edge: TaskbarEdge) -> NativeResult<()> {
        let hwnd = find_window("Shell_TrayWnd").ok_or(Win32Status::FILE_NOT_FOUND)?;
        debug!(?edge, "Repositioning main taskbar");
        broadcast_tray_settings(hwnd)
    }

    fn reposition_secondary_taskbars(&self) -> NativeResult<()> {
        let class = wide("Shell_SecondaryTrayWnd");
        let mut previous = HWND::default();
        let mut count = 0;
        loop {
            // SAFETY: `class` is NUL-terminated; `previous` is a window handle
            // returned by the previous iteration or null.
            let next = unsafe {
                FindWindowExW(
                    HWND::default(),
                    previous,
                    PCWSTR(class.as_ptr()),
                    PCWSTR::null(),
                )
            };
            let Ok(hwnd) = next else { break };
            if hwnd.is_invalid() {
                break;
            }
            if let Err(status) = broadcast_tray_settings(hwnd) {
                warn!(%status, "Secondary taskbar did not answer");
            }
            previous = hwnd;
            count += 1;
        }
        debug!(count, "Repositioned secondary taskbars");
        Ok(())
    }

    fn taskbar_settings(&self) -> NativeResult<TaskbarSettings> {
        let key = RegKey::open(ADVANCED_KEY, KEY_READ)?;
        let mut settings = TaskbarSettings::default();
        for name in TASKBAR_OPTIONS {
            if let Some((kind, data)) = key.read(name)? {
                if kind == REG_DWORD {
                    if let Ok(bytes) = <[u8; 4]>::try_from(data.as_slice()) {
                        settings.set(*name, u32::from_le_bytes(bytes));
                    }
                }
            }
        }
        Ok(settings)
    }

    fn apply_taskbar_settings(&self, settings: &TaskbarSettings) -> NativeResult<()> {
        let key = RegKey::open(ADVANCED_KEY, KEY_WRITE)?;
        for (name, value) in &settings.options {
            key.write(name, REG_DWORD, &value.to_le_bytes())?;
        }
        debug!(count = settings.options.len(), "Wrote taskbar settings");
        Ok(())
    }

    fn refresh_tray_area(&self) {
        if let Err(status) = broadcast_tray_settings(HWND_BROADCAST) {
            warn!(%status, "Tray refresh broadcast failed");
        }
    }
}
