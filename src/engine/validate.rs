//! Possibility, validity and activity checks for saved snapshots.

use tracing::{debug, info, instrument, warn};

use super::DisplayEngine;
use crate::error::Result;
use crate::platform::{Platform, SetConfigFlags};
use crate::snapshot::{Snapshot, structurally_equal};

impl<P: Platform> DisplayEngine<P> {
    /// Every display the snapshot needs is connected.
    ///
    /// Cheap and read-only. Check this before [`is_valid`](Self::is_valid).
    #[instrument(skip_all)]
    pub fn is_possible(&self, snapshot: &Snapshot) -> Result<bool> {
        Ok(self.missing_displays(snapshot)?.is_empty())
    }

    /// Saved fingerprints with no connected display.
    pub fn missing_displays(&self, snapshot: &Snapshot) -> Result<Vec<String>> {
        let connected = self.connected_fingerprints()?;
        let missing: Vec<String> = snapshot
            .fingerprints
            .iter()
            .filter(|f| !connected.contains(*f))
            .cloned()
            .collect();
        for fingerprint in &missing {
            debug!(%fingerprint, "Display not connected");
        }
        Ok(missing)
    }

    /// The OS accepts the reconciled snapshot.
    ///
    /// Every saved adapter must be live; the working copy is then submitted
    /// in validate-only mode and the answer is returned as is.
    #[instrument(skip_all)]
    pub fn is_valid(&self, snapshot: &Snapshot) -> Result<bool> {
        let live = self.live_adapters()?;
        if let Some(entry) = snapshot
            .adapters
            .iter()
            .find(|e| live.handle_for_path(&e.device_path).is_none())
        {
            warn!(adapter = %entry.handle, device_path = %entry.device_path, "Saved adapter is not live");
            return Ok(false);
        }

        let working = self.prepare_against(snapshot, &live)?;
        match self.platform.set_config(
            &working.snapshot.paths,
            &working.snapshot.modes,
            SetConfigFlags::VALIDATE_SUPPLIED,
        ) {
            Ok(()) => {
                info!("Display configuration is valid");
                Ok(true)
            }
            Err(status) => {
                warn!(%status, "Display configuration rejected during validation");
                Ok(false)
            }
        }
    }

    /// The live active topology equals `snapshot`.
    #[instrument(skip_all)]
    pub fn is_active(&mut self, snapshot: &Snapshot) -> Result<bool> {
        let live = self.capture_active()?;
        Ok(structurally_equal(snapshot, &live))
    }
}
