//! Display fingerprints.
//!
//! A fingerprint identifies a physical monitor on a physical connector
//! without relying on the volatile handles the OS hands out per boot:
//!
//! ```text
//! WINAPI|<adapter device path>|<output technology>|<EDID manufacturer>|<EDID product>|<monitor device path>|<friendly name>
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::platform::TargetDeviceName;

/// Placeholder for a component the driver did not report.
pub const MISSING: &str = "#";

const PREFIX: &str = "WINAPI";
const MONITOR_PATH_FIELD: usize = 5;

static CONNECTOR_UID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)UID(\d+)#").expect("valid connector uid pattern"));

static TASKBAR_DEVICE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DISPLAY#(.*)#\{").expect("valid device path pattern"));

static BUS_VENDOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(PCI|USB)#(?:VEN|VID)_([0-9A-Za-z_]{4})&").expect("valid vendor pattern")
});

const SUPERDISPLAY_MARKER: &str = "SuperDisplay#";

fn or_missing(value: &str) -> &str {
    if value.is_empty() { MISSING } else { value }
}

/// Build the fingerprint of one path from its adapter and target names.
///
/// A name query that failed is passed as `None`; each of its components is
/// then substituted with [`MISSING`].
#[must_use]
pub fn build(adapter_device_path: Option<&str>, target: Option<&TargetDeviceName>) -> String {
    let adapter = adapter_device_path.map_or(MISSING, or_missing);
    let fields: [String; 5] = match target {
        Some(t) => [
            format!("DISPLAYCONFIG_OUTPUT_TECHNOLOGY_{}", t.output_technology.name()),
            t.edid_manufacturer_id.to_string(),
            t.edid_product_code_id.to_string(),
            or_missing(&t.monitor_device_path).to_string(),
            or_missing(&t.friendly_name).to_string(),
        ],
        None => std::array::from_fn(|_| MISSING.to_string()),
    };
    let mut parts = Vec::with_capacity(7);
    parts.push(PREFIX);
    parts.push(adapter);
    parts.extend(fields.iter().map(String::as_str));
    parts.join("|")
}

/// Sort and deduplicate a fingerprint list in place.
pub fn normalize(fingerprints: &mut Vec<String>) {
    fingerprints.sort();
    fingerprints.dedup();
}

/// Numeric connector id embedded in a fingerprint (`UID<digits>#`).
#[must_use]
pub fn connector_uid(fingerprint: &str) -> Option<u32> {
    CONNECTOR_UID
        .captures(fingerprint)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Distinct connector ids of the given fingerprints, in first-seen order.
#[must_use]
pub fn live_target_ids<S: AsRef<str>>(fingerprints: &[S]) -> Vec<u32> {
    let mut ids = Vec::new();
    for id in fingerprints.iter().filter_map(|f| connector_uid(f.as_ref())) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Monitor device path used as the taskbar record key
/// (`DISPLAY#<path>#{` inside the monitor path component).
#[must_use]
pub fn taskbar_device_path(fingerprint: &str) -> Option<String> {
    let field = fingerprint.split('|').nth(MONITOR_PATH_FIELD)?;
    TASKBAR_DEVICE_PATH
        .captures(field)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Video card vendor id (`VEN_xxxx` / `VID_xxxx`) of an adapter device path.
#[must_use]
pub fn vendor_id(adapter_device_path: &str) -> Option<String> {
    if let Some(caps) = BUS_VENDOR.captures(adapter_device_path) {
        return caps.get(2).map(|m| m.as_str().to_string());
    }
    adapter_device_path
        .contains(SUPERDISPLAY_MARKER)
        .then(|| "SuperDisplay".to_string())
}
