//! Display engine: capture, reconcile, validate and apply snapshots.
//!
//! [`DisplayEngine`] is the single context object of the crate. It owns the
//! platform handle and the most recently captured snapshot; every mutating
//! operation takes `&mut self`, so callers serialize naturally.
//!
//! # Usage
//!
//! ```ignore
//! use dprof::engine::DisplayEngine;
//!
//! let mut engine = DisplayEngine::new(dprof::platform::native()?, config);
//! let saved = engine.capture_active()?;
//! // ... user rearranges the displays ...
//! if engine.is_possible(&saved)? && engine.is_valid(&saved)? {
//!     engine.apply(&saved)?;
//! }
//! ```

mod apply;
mod capture;
mod clone_remap;
mod reconcile;
mod validate;

pub use apply::{APPLY_LADDER, ApplyReport, ApplyStep};
pub use clone_remap::{CloneRemap, TargetSubstitution, plan_clone_remap};
pub use reconcile::{AdapterRemap, build_adapter_remap, patch_adapters};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::platform::{Platform, QuerySelector};
use crate::snapshot::{AdapterTable, Snapshot, fingerprint};

/// A reconciled copy of a saved snapshot, ready to hand to the OS.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingCopy {
    pub snapshot: Snapshot,
    pub adapter_remap: AdapterRemap,
    pub clone_remap: CloneRemap,
}

/// Display configuration engine over a [`Platform`].
pub struct DisplayEngine<P: Platform> {
    platform: P,
    config: EngineConfig,
    last_captured: Option<Snapshot>,
}

impl<P: Platform> DisplayEngine<P> {
    #[must_use]
    pub fn new(platform: P, config: EngineConfig) -> Self {
        Self {
            platform,
            config,
            last_captured: None,
        }
    }

    #[must_use]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot taken by the last successful capture or apply.
    #[must_use]
    pub fn last_captured(&self) -> Option<&Snapshot> {
        self.last_captured.as_ref()
    }

    /// Capture the paths selected by `selector` and remember the result.
    #[instrument(skip(self))]
    pub fn capture(&mut self, selector: QuerySelector) -> Result<Snapshot> {
        let snapshot = capture::capture_snapshot(&self.platform, selector)?;
        info!(
            displays = snapshot.fingerprints.len(),
            active = snapshot.active_path_count(),
            "Captured display configuration"
        );
        self.last_captured = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Capture the active topology.
    pub fn capture_active(&mut self) -> Result<Snapshot> {
        self.capture(QuerySelector::active(self.config.include_virtual))
    }

    /// Capture every path the hardware could drive.
    pub fn capture_all(&mut self) -> Result<Snapshot> {
        self.capture(QuerySelector::all_paths(self.config.include_virtual))
    }

    /// Re-capture the active topology into `last_captured`.
    pub fn refresh(&mut self) -> Result<&Snapshot> {
        self.capture_active()?;
        Ok(self.last_captured.get_or_insert_with(Snapshot::new))
    }

    /// Adapters currently enumerated, over all paths including virtual ones.
    #[instrument(skip(self))]
    pub fn live_adapters(&self) -> Result<AdapterTable> {
        let topology = capture::query_topology(&self.platform, QuerySelector::all_paths(true))?;
        let table = capture::adapter_table(&self.platform, &topology.paths);
        debug!(count = table.len(), "Live adapters");
        Ok(table)
    }

    /// Fingerprints of every connected display, active or not.
    pub fn connected_fingerprints(&self) -> Result<Vec<String>> {
        self.fingerprints_for(QuerySelector::all_paths(self.config.include_virtual))
    }

    /// Fingerprints of the displays in the active topology.
    pub fn current_fingerprints(&self) -> Result<Vec<String>> {
        self.fingerprints_for(QuerySelector::active(self.config.include_virtual))
    }

    fn fingerprints_for(&self, selector: QuerySelector) -> Result<Vec<String>> {
        let topology = capture::query_topology(&self.platform, selector)?;
        let adapters = capture::adapter_table(&self.platform, &topology.paths);
        Ok(capture::fingerprints(
            &self.platform,
            &topology.paths,
            &adapters,
        ))
    }

    /// Vendor ids of the live video cards, e.g. `10DE`.
    #[instrument(skip(self))]
    pub fn video_card_vendors(&self) -> Result<Vec<String>> {
        let mut vendors: Vec<String> = Vec::new();
        for entry in self.live_adapters()?.iter() {
            if let Some(id) = fingerprint::vendor_id(&entry.device_path) {
                if !vendors.contains(&id) {
                    vendors.push(id);
                }
            }
        }
        Ok(vendors)
    }

    /// Reconcile a saved snapshot with the live hardware.
    ///
    /// The saved snapshot is left as is; the returned copy carries live adapter
    /// handles and, for cloned topologies, repaired target ids.
    #[instrument(skip_all)]
    pub fn prepare(&self, snapshot: &Snapshot) -> Result<WorkingCopy> {
        let live = self.live_adapters()?;
        self.prepare_against(snapshot, &live)
    }

    fn prepare_against(&self, snapshot: &Snapshot, live: &AdapterTable) -> Result<WorkingCopy> {
        let adapter_remap =
            build_adapter_remap(&snapshot.adapters, live, self.config.unmatched_adapter)?;
        let patched = patch_adapters(snapshot, &adapter_remap);

        let clone_remap = if patched.is_cloned {
            let connected = self.connected_fingerprints()?;
            plan_clone_remap(&patched, &fingerprint::live_target_ids(&connected))
        } else {
            CloneRemap::default()
        };
        let snapshot = clone_remap.apply(&patched);
        debug!(
            adapters = adapter_remap.len(),
            fallbacks = adapter_remap.fallbacks().len(),
            substitutions = clone_remap.substitutions.len(),
            "Working copy prepared"
        );
        Ok(WorkingCopy {
            snapshot,
            adapter_remap,
            clone_remap,
        })
    }
}
