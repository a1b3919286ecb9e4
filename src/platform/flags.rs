//! Flag sets passed to the native display configuration calls.

use bitflags::bitflags;

bitflags! {
    /// Path selection for `QueryDisplayConfig` (`QDC_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QuerySelector: u32 {
        const ALL_PATHS = 0x0000_0001;
        const ONLY_ACTIVE_PATHS = 0x0000_0002;
        const DATABASE_CURRENT = 0x0000_0004;
        const VIRTUAL_MODE_AWARE = 0x0000_0010;
        const INCLUDE_HMD = 0x0000_0020;
    }
}

impl QuerySelector {
    /// Active paths, optionally including head-mounted and virtual displays.
    #[must_use]
    pub fn active(include_virtual: bool) -> Self {
        Self::with_virtual(Self::ONLY_ACTIVE_PATHS, include_virtual)
    }

    /// Every path the hardware could drive.
    #[must_use]
    pub fn all_paths(include_virtual: bool) -> Self {
        Self::with_virtual(Self::ALL_PATHS, include_virtual)
    }

    fn with_virtual(base: Self, include_virtual: bool) -> Self {
        if include_virtual {
            base | Self::INCLUDE_HMD
        } else {
            base
        }
    }
}

bitflags! {
    /// Behaviour of `SetDisplayConfig` (`SDC_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SetConfigFlags: u32 {
        const TOPOLOGY_INTERNAL = 0x0000_0001;
        const TOPOLOGY_CLONE = 0x0000_0002;
        const TOPOLOGY_EXTEND = 0x0000_0004;
        const TOPOLOGY_EXTERNAL = 0x0000_0008;
        const TOPOLOGY_SUPPLIED = 0x0000_0010;
        const USE_SUPPLIED_DISPLAY_CONFIG = 0x0000_0020;
        const VALIDATE = 0x0000_0040;
        const APPLY = 0x0000_0080;
        const NO_OPTIMIZATION = 0x0000_0100;
        const SAVE_TO_DATABASE = 0x0000_0200;
        const ALLOW_CHANGES = 0x0000_0400;
        const PATH_PERSIST_IF_REQUIRED = 0x0000_0800;
        const FORCE_MODE_ENUMERATION = 0x0000_1000;
        const ALLOW_PATH_ORDER_CHANGES = 0x0000_2000;
        const VIRTUAL_MODE_AWARE = 0x0000_8000;
    }
}

impl SetConfigFlags {
    /// Validate a supplied configuration without committing it.
    pub const VALIDATE_SUPPLIED: Self = Self::VALIDATE
        .union(Self::USE_SUPPLIED_DISPLAY_CONFIG)
        .union(Self::ALLOW_CHANGES);
}

bitflags! {
    /// GDI display device state (`DISPLAY_DEVICE_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceStateFlags: u32 {
        const ATTACHED_TO_DESKTOP = 0x0000_0001;
        const MULTI_DRIVER = 0x0000_0002;
        const PRIMARY_DEVICE = 0x0000_0004;
        const MIRRORING_DRIVER = 0x0000_0008;
        const VGA_COMPATIBLE = 0x0000_0010;
        const REMOVABLE = 0x0000_0020;
        const DISCONNECT = 0x0200_0000;
        const REMOTE = 0x0400_0000;
        const MODESPRUNED = 0x0800_0000;
    }
}

impl DeviceStateFlags {
    /// Devices whose settings are captured: on the desktop or multi-driver.
    #[must_use]
    pub const fn is_captured(self) -> bool {
        self.intersects(Self::ATTACHED_TO_DESKTOP.union(Self::MULTI_DRIVER))
    }
}
