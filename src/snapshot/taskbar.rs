//! Taskbar placement records.
//!
//! The shell keeps one "stuck rectangle" blob per monitor plus one for the
//! primary screen. Only the layout of schema versions 2 and 3 is understood;
//! other versions are carried as opaque bytes and never written back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::Rect;

/// Registry value name of the primary screen record.
pub const MAIN_SCREEN_PATH: &str = "Settings";

/// Named shell options captured alongside the layout.
pub const TASKBAR_OPTIONS: &[&str] = &[
    "TaskbarAl",
    "TaskbarDa",
    "TaskbarGlomLevel",
    "TaskbarMn",
    "TaskbarSi",
    "TaskbarSizeMove",
    "TaskbarSmallIcons",
    "MMTaskbarEnabled",
    "MMTaskbarGlomLevel",
    "MMTaskbarMode",
    "ShowTaskViewButton",
];

const EDGE_OFFSET: usize = 12;
const RECT_OFFSET: usize = 24;
const AUTO_HIDE_OFFSET: usize = 8;
const AUTO_HIDE_BIT: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskbarEdge {
    Left,
    Top,
    Right,
    #[default]
    Bottom,
}

impl TaskbarEdge {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Left),
            1 => Some(Self::Top),
            2 => Some(Self::Right),
            3 => Some(Self::Bottom),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Left => 0,
            Self::Top => 1,
            Self::Right => 2,
            Self::Bottom => 3,
        }
    }
}

/// Stuck-rectangle blob as stored by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckRect {
    pub version: u32,
    pub binary: Vec<u8>,
}

/// Taskbar placement on one monitor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskbarLayoutRecord {
    pub device_path: String,
    pub main_screen: bool,
    pub version: u32,
    pub edge: TaskbarEdge,
    pub rect: Rect,
    pub auto_hide: bool,
    pub binary: Vec<u8>,
}

impl TaskbarLayoutRecord {
    /// Decode a record read from the shell; `None` means no blob exists.
    #[must_use]
    pub fn decode(device_path: &str, stuck: Option<StuckRect>) -> Self {
        let main_screen = device_path == MAIN_SCREEN_PATH;
        let Some(StuckRect { version, binary }) = stuck else {
            return Self {
                device_path: device_path.to_string(),
                main_screen,
                ..Self::default()
            };
        };

        let mut record = Self {
            device_path: device_path.to_string(),
            main_screen,
            version,
            ..Self::default()
        };
        if Self::is_known_version(version) {
            record.auto_hide = binary
                .get(AUTO_HIDE_OFFSET)
                .is_some_and(|b| b & AUTO_HIDE_BIT != 0);
            if let Some(edge) = read_u32(&binary, EDGE_OFFSET).and_then(TaskbarEdge::from_raw) {
                record.edge = edge;
            }
            if let Some(rect) = read_rect(&binary, RECT_OFFSET) {
                record.rect = rect;
            }
        }
        record.binary = binary;
        record
    }

    #[must_use]
    pub const fn is_known_version(version: u32) -> bool {
        matches!(version, 2 | 3)
    }

    /// Whether this record may be written back to the shell.
    #[must_use]
    pub fn is_restorable(&self) -> bool {
        Self::is_known_version(self.version) && !self.binary.is_empty()
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let chunk = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(chunk.try_into().ok()?))
}

fn read_i32(bytes: &[u8], offset: usize) -> Option<i32> {
    let chunk = bytes.get(offset..offset + 4)?;
    Some(i32::from_le_bytes(chunk.try_into().ok()?))
}

fn read_rect(bytes: &[u8], offset: usize) -> Option<Rect> {
    Some(Rect {
        left: read_i32(bytes, offset)?,
        top: read_i32(bytes, offset + 4)?,
        right: read_i32(bytes, offset + 8)?,
        bottom: read_i32(bytes, offset + 12)?,
    })
}

/// Named taskbar option values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskbarSettings {
    pub options: BTreeMap<String, u32>,
}

impl TaskbarSettings {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u32> {
        self.options.get(name).copied()
    }

    pub fn set(&mut self, name: impl Into<String>, value: u32) {
        self.options.insert(name.into(), value);
    }
}
