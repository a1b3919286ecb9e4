//! Structural equality between snapshots.
//!
//! Volatile adapter handles are never compared: the fingerprint list already
//! carries hardware identity, and handles change on every boot.

use std::fmt;

use serde::Serialize;

use super::schema::{
    DisplayMode, DisplayPath, HdrState, LegacyDisplaySetting, PathSource, PathTarget, Snapshot,
};

/// A snapshot component that takes part in structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Paths,
    Modes,
    HdrStates,
    LegacySettings,
    Fingerprints,
    TaskbarLayout,
    TaskbarSettings,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Paths => "display paths",
            Self::Modes => "display modes",
            Self::HdrStates => "HDR states",
            Self::LegacySettings => "legacy display settings",
            Self::Fingerprints => "connected displays",
            Self::TaskbarLayout => "taskbar layout",
            Self::TaskbarSettings => "taskbar settings",
        };
        f.write_str(name)
    }
}

fn source_eq(a: &PathSource, b: &PathSource) -> bool {
    a.id == b.id && a.mode_info_idx == b.mode_info_idx && a.status_flags == b.status_flags
}

fn target_eq(a: &PathTarget, b: &PathTarget) -> bool {
    a.id == b.id
        && a.mode_info_idx == b.mode_info_idx
        && a.output_technology == b.output_technology
        && a.rotation == b.rotation
        && a.scaling == b.scaling
        && a.refresh_rate == b.refresh_rate
        && a.scan_line_ordering == b.scan_line_ordering
        && a.target_available == b.target_available
        && a.status_flags == b.status_flags
}

#[must_use]
pub fn path_eq(a: &DisplayPath, b: &DisplayPath) -> bool {
    a.flags == b.flags && source_eq(&a.source, &b.source) && target_eq(&a.target, &b.target)
}

#[must_use]
pub fn mode_eq(a: &DisplayMode, b: &DisplayMode) -> bool {
    a.id == b.id && a.info == b.info
}

/// HDR entries compare on their query payloads; the top-level handle and
/// target id are bookkeeping.
#[must_use]
pub fn hdr_eq(a: &HdrState, b: &HdrState) -> bool {
    let (ac, bc) = (&a.advanced_color, &b.advanced_color);
    let (aw, bw) = (&a.sdr_white_level, &b.sdr_white_level);
    ac.header.id == bc.header.id
        && ac.advanced_color_supported == bc.advanced_color_supported
        && ac.advanced_color_enabled == bc.advanced_color_enabled
        && ac.wide_color_enforced == bc.wide_color_enforced
        && ac.advanced_color_force_disabled == bc.advanced_color_force_disabled
        && ac.color_encoding == bc.color_encoding
        && ac.bits_per_color_channel == bc.bits_per_color_channel
        && aw.header.id == bw.header.id
        && aw.level == bw.level
}

/// Legacy settings compare by value; device key and GDI name are ignored.
#[must_use]
pub fn legacy_setting_eq(a: &LegacyDisplaySetting, b: &LegacyDisplaySetting) -> bool {
    a.device_string == b.device_string
        && a.is_enabled == b.is_enabled
        && a.is_primary == b.is_primary
        && a.mode == b.mode
}

fn slices_eq<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| eq(x, y))
}

/// Multiset equality: every value in `a` pairs with a distinct equal value in `b`.
fn multiset_eq<'a, T: 'a>(
    a: impl ExactSizeIterator<Item = &'a T>,
    b: impl ExactSizeIterator<Item = &'a T>,
    eq: impl Fn(&T, &T) -> bool,
) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut remaining: Vec<&T> = b.collect();
    for x in a {
        match remaining.iter().position(|y| eq(x, *y)) {
            Some(i) => {
                remaining.swap_remove(i);
            }
            None => return false,
        }
    }
    true
}

/// Components that differ between two snapshots, in declaration order.
#[must_use]
pub fn diff(a: &Snapshot, b: &Snapshot) -> Vec<Component> {
    let mut changed = Vec::new();
    if !slices_eq(&a.paths, &b.paths, path_eq) {
        changed.push(Component::Paths);
    }
    if !slices_eq(&a.modes, &b.modes, mode_eq) {
        changed.push(Component::Modes);
    }
    if !slices_eq(&a.hdr_states, &b.hdr_states, hdr_eq) {
        changed.push(Component::HdrStates);
    }
    if !multiset_eq(
        a.legacy_settings.values(),
        b.legacy_settings.values(),
        legacy_setting_eq,
    ) {
        changed.push(Component::LegacySettings);
    }
    if a.fingerprints != b.fingerprints {
        changed.push(Component::Fingerprints);
    }
    if a.taskbar_layout != b.taskbar_layout {
        changed.push(Component::TaskbarLayout);
    }
    if a.taskbar_settings != b.taskbar_settings {
        changed.push(Component::TaskbarSettings);
    }
    changed
}

#[must_use]
pub fn structurally_equal(a: &Snapshot, b: &Snapshot) -> bool {
    diff(a, b).is_empty()
}

impl Snapshot {
    /// Structural equality; see [`diff`] for the field policy.
    #[must_use]
    pub fn same_layout(&self, other: &Self) -> bool {
        structurally_equal(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{AdapterId, LegacyDeviceMode};

    fn setting(key: &str, name: &str, freq: u32, primary: bool) -> LegacyDisplaySetting {
        LegacyDisplaySetting {
            device_name: name.to_string(),
            device_key: key.to_string(),
            device_string: "NVIDIA GeForce RTX 3070".to_string(),
            is_enabled: true,
            is_primary: primary,
            mode: LegacyDeviceMode {
                frequency: freq,
                bits_per_pixel: 32,
                ..LegacyDeviceMode::default()
            },
        }
    }

    #[test]
    fn test_adapter_handles_are_ignored() {
        let mut a = Snapshot::new();
        let mut path = DisplayPath::default();
        path.source.adapter_id = AdapterId(1);
        path.target.adapter_id = AdapterId(1);
        path.target.id = 4353;
        a.paths.push(path);
        let mut hdr = HdrState::default();
        hdr.set_adapter(AdapterId(1));
        a.hdr_states.push(hdr);

        let mut b = a.clone();
        b.paths[0].source.adapter_id = AdapterId(77);
        b.paths[0].target.adapter_id = AdapterId(77);
        b.hdr_states[0].set_adapter(AdapterId(77));
        b.hdr_states[0].target_id = 9;

        assert!(structurally_equal(&a, &b));
    }

    #[test]
    fn test_target_id_change_is_detected() {
        let mut a = Snapshot::new();
        a.paths.push(DisplayPath::default());
        let mut b = a.clone();
        b.paths[0].target.id = 200;
        assert_eq!(diff(&a, &b), vec![Component::Paths]);
    }

    #[test]
    fn test_legacy_settings_compare_as_value_set() {
        let mut a = Snapshot::new();
        a.legacy_settings
            .insert("k1".into(), setting("k1", r"\\.\DISPLAY1", 60, true));
        a.legacy_settings
            .insert("k2".into(), setting("k2", r"\\.\DISPLAY2", 144, false));

        let mut b = Snapshot::new();
        b.legacy_settings
            .insert("zz".into(), setting("zz", r"\\.\DISPLAY5", 144, false));
        b.legacy_settings
            .insert("aa".into(), setting("aa", r"\\.\DISPLAY4", 60, true));
        assert!(structurally_equal(&a, &b));

        b.legacy_settings
            .insert("aa".into(), setting("aa", r"\\.\DISPLAY4", 75, true));
        assert_eq!(diff(&a, &b), vec![Component::LegacySettings]);
    }

    #[test]
    fn test_legacy_duplicates_need_matching_counts() {
        let mut a = Snapshot::new();
        a.legacy_settings.insert("k1".into(), setting("k1", "a", 60, false));
        a.legacy_settings.insert("k2".into(), setting("k2", "b", 60, false));
        let mut b = Snapshot::new();
        b.legacy_settings.insert("k1".into(), setting("k1", "a", 60, false));
        b.legacy_settings.insert("k2".into(), setting("k2", "b", 75, false));
        assert!(!structurally_equal(&a, &b));
    }

    #[test]
    fn test_source_groups_and_clone_flag_are_excluded() {
        let a = Snapshot::new();
        let mut b = Snapshot::new();
        b.source_groups.insert(r"\\.\DISPLAY1".into(), vec![0, 1]);
        b.is_cloned = true;
        assert!(a.same_layout(&b));
    }

    #[test]
    fn test_diff_reports_every_component() {
        let a = Snapshot::new();
        let mut b = Snapshot::new();
        b.fingerprints.push("WINAPI|x".into());
        b.taskbar_settings.set("TaskbarAl", 0);
        assert_eq!(
            diff(&a, &b),
            vec![Component::Fingerprints, Component::TaskbarSettings]
        );
    }
}
