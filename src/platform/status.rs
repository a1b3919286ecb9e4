//! Typed results of native calls.

use std::fmt;

/// Raw `WIN32_ERROR` code returned by the CCD functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Win32Status(pub u32);

impl Win32Status {
    pub const SUCCESS: Self = Self(0);
    pub const FILE_NOT_FOUND: Self = Self(2);
    pub const ACCESS_DENIED: Self = Self(5);
    pub const GEN_FAILURE: Self = Self(31);
    pub const NOT_SUPPORTED: Self = Self(50);
    pub const INVALID_PARAMETER: Self = Self(87);
    pub const INSUFFICIENT_BUFFER: Self = Self(122);
    pub const BAD_CONFIGURATION: Self = Self(1610);

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Symbolic name for the codes the display stack is known to return.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("ERROR_SUCCESS"),
            2 => Some("ERROR_FILE_NOT_FOUND"),
            5 => Some("ERROR_ACCESS_DENIED"),
            31 => Some("ERROR_GEN_FAILURE"),
            50 => Some("ERROR_NOT_SUPPORTED"),
            87 => Some("ERROR_INVALID_PARAMETER"),
            122 => Some("ERROR_INSUFFICIENT_BUFFER"),
            1610 => Some("ERROR_BAD_CONFIGURATION"),
            _ => None,
        }
    }
}

impl fmt::Display for Win32Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "WIN32 status {}", self.0),
        }
    }
}

/// Result of a single native call.
pub type NativeResult<T> = std::result::Result<T, Win32Status>;

/// Outcome of a legacy per-device mode change (`DISP_CHANGE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispChange {
    Successful,
    Restart,
    Failed,
    BadMode,
    NotUpdated,
    BadFlags,
    BadParam,
    BadDualView,
}

impl DispChange {
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Successful,
            1 => Self::Restart,
            -2 => Self::BadMode,
            -3 => Self::NotUpdated,
            -4 => Self::BadFlags,
            -5 => Self::BadParam,
            -6 => Self::BadDualView,
            _ => Self::Failed,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Successful => 0,
            Self::Restart => 1,
            Self::Failed => -1,
            Self::BadMode => -2,
            Self::NotUpdated => -3,
            Self::BadFlags => -4,
            Self::BadParam => -5,
            Self::BadDualView => -6,
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Successful)
    }
}

impl fmt::Display for DispChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Successful => "DISP_CHANGE_SUCCESSFUL",
            Self::Restart => "DISP_CHANGE_RESTART: a reboot is required for the mode to take effect",
            Self::Failed => "DISP_CHANGE_FAILED: the driver failed the mode",
            Self::BadMode => "DISP_CHANGE_BADMODE: the mode is not supported",
            Self::NotUpdated => "DISP_CHANGE_NOTUPDATED: the registry could not be written",
            Self::BadFlags => "DISP_CHANGE_BADFLAGS: invalid flags",
            Self::BadParam => "DISP_CHANGE_BADPARAM: invalid parameter",
            Self::BadDualView => "DISP_CHANGE_BADDUALVIEW: the system is DualView capable",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(
            Win32Status::INVALID_PARAMETER.to_string(),
            "ERROR_INVALID_PARAMETER (87)"
        );
        assert_eq!(Win32Status(9999).to_string(), "WIN32 status 9999");
        assert!(Win32Status::SUCCESS.is_success());
        assert!(!Win32Status::NOT_SUPPORTED.is_success());
    }

    #[test]
    fn test_disp_change_raw_values() {
        for raw in -6..=1 {
            assert_eq!(DispChange::from_raw(raw).as_raw(), raw);
        }
        assert_eq!(DispChange::from_raw(-42), DispChange::Failed);
        assert!(DispChange::Successful.is_success());
        assert!(!DispChange::Restart.is_success());
    }
}
