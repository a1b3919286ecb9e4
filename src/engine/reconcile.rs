//! Adapter identity reconciliation.
//!
//! Adapter handles are reissued on every boot and driver reload. A saved
//! snapshot is matched to the live adapters through their device paths, and
//! the resulting handle map is applied to a copy of the snapshot in one pass.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::UnmatchedAdapterPolicy;
use crate::error::{DprofError, Result};
use crate::snapshot::{AdapterId, AdapterTable, Snapshot};

/// Saved handle to live handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdapterRemap {
    map: BTreeMap<AdapterId, AdapterId>,
    /// Saved handles that fell back to the first live adapter.
    fallbacks: Vec<AdapterId>,
}

impl AdapterRemap {
    #[must_use]
    pub fn get(&self, saved: AdapterId) -> Option<AdapterId> {
        self.map.get(&saved).copied()
    }

    /// Live handle for `saved`, or `saved` itself when it is not mapped.
    #[must_use]
    pub fn resolve(&self, saved: AdapterId) -> AdapterId {
        self.get(saved).unwrap_or(saved)
    }

    #[must_use]
    pub fn fallbacks(&self) -> &[AdapterId] {
        &self.fallbacks
    }

    /// True when every handle maps to itself.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.map.iter().all(|(old, new)| old == new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AdapterId, AdapterId)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Match every saved adapter to a live adapter with the same device path.
///
/// Unmatched adapters are handled according to `policy`.
pub fn build_adapter_remap(
    saved: &AdapterTable,
    live: &AdapterTable,
    policy: UnmatchedAdapterPolicy,
) -> Result<AdapterRemap> {
    let first_live = live.first().ok_or(DprofError::NoLiveAdapters)?.handle;
    let mut remap = AdapterRemap::default();

    for entry in saved.iter() {
        if let Some(handle) = live.handle_for_path(&entry.device_path) {
            debug!(saved = %entry.handle, live = %handle, "Adapter matched by device path");
            remap.map.insert(entry.handle, handle);
            continue;
        }
        match policy {
            UnmatchedAdapterPolicy::Refuse => {
                return Err(DprofError::IdentityMismatch {
                    handle: entry.handle.0,
                    device_path: entry.device_path.clone(),
                });
            }
            UnmatchedAdapterPolicy::FirstLive => {
                warn!(
                    saved = %entry.handle,
                    device_path = %entry.device_path,
                    fallback = %first_live,
                    "Adapter not found, falling back to the first live adapter"
                );
                remap.map.insert(entry.handle, first_live);
                remap.fallbacks.push(entry.handle);
            }
        }
    }
    Ok(remap)
}

/// Copy of `snapshot` with every adapter handle rewritten through `remap`.
///
/// Touches path sources and targets, modes, all three handle occurrences of
/// each HDR entry and the adapter table.
#[must_use]
pub fn patch_adapters(snapshot: &Snapshot, remap: &AdapterRemap) -> Snapshot {
    let mut patched = snapshot.clone();

    for path in &mut patched.paths {
        path.source.adapter_id = remap.resolve(path.source.adapter_id);
        path.target.adapter_id = remap.resolve(path.target.adapter_id);
    }
    for mode in &mut patched.modes {
        mode.adapter_id = remap.resolve(mode.adapter_id);
    }
    for hdr in &mut patched.hdr_states {
        hdr.set_adapter(remap.resolve(hdr.adapter_id));
    }

    let mut adapters = AdapterTable::new();
    for entry in snapshot.adapters.iter() {
        adapters.insert(remap.resolve(entry.handle), entry.device_path.clone());
    }
    patched.adapters = adapters;
    patched
}
