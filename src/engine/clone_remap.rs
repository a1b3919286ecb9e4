//! Target id repair for cloned topologies.
//!
//! In a clone group several paths share one source. Their saved target ids may
//! be stale or duplicated, so each path that cannot claim a live connector id
//! is handed one of the live ids nobody else claimed.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::snapshot::{ModeKind, Snapshot};

/// One target id rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetSubstitution {
    pub path_index: usize,
    pub from: u32,
    pub to: u32,
}

/// Outcome of planning the remap of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloneRemap {
    pub substitutions: Vec<TargetSubstitution>,
    /// Paths (index, target id) that found no free live id.
    pub unresolved: Vec<(usize, u32)>,
}

impl CloneRemap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }

    /// Copy of `snapshot` with the substitutions applied to paths and to
    /// target-kind modes.
    #[must_use]
    pub fn apply(&self, snapshot: &Snapshot) -> Snapshot {
        let mut patched = snapshot.clone();
        if self.is_empty() {
            return patched;
        }

        let substituted: BTreeSet<usize> = self.substitutions.iter().map(|s| s.path_index).collect();
        // Target modes still owned by paths that kept their id.
        let owned: BTreeSet<u32> = patched
            .paths
            .iter()
            .enumerate()
            .filter(|(i, _)| !substituted.contains(i))
            .map(|(_, p)| p.target.mode_info_idx)
            .collect();

        for sub in &self.substitutions {
            if let Some(path) = patched.paths.get_mut(sub.path_index) {
                path.target.id = sub.to;
            }
        }

        let mut pending: Vec<TargetSubstitution> = self.substitutions.clone();
        for (idx, mode) in patched.modes.iter_mut().enumerate() {
            if mode.kind() != ModeKind::Target
                || u32::try_from(idx).is_ok_and(|i| owned.contains(&i))
            {
                continue;
            }
            if let Some(pos) = pending.iter().position(|s| s.from == mode.id) {
                let sub = pending.remove(pos);
                debug!(from = sub.from, to = sub.to, mode = idx, "Target mode remapped");
                mode.id = sub.to;
            }
        }
        patched
    }
}

/// Plan the target id repair of `snapshot` against the live connector ids.
///
/// A path whose target id is live and unclaimed keeps it; paths outside clone
/// groups claim first. Nothing is substituted unless the snapshot is cloned.
#[must_use]
pub fn plan_clone_remap(snapshot: &Snapshot, live_ids: &[u32]) -> CloneRemap {
    if !snapshot.is_cloned {
        return CloneRemap::default();
    }

    let members = snapshot.clone_member_indices();
    let order: Vec<usize> = (0..snapshot.paths.len())
        .filter(|i| !members.contains(i))
        .chain(members.iter().copied())
        .collect();

    let mut claimed: Vec<u32> = Vec::new();
    let mut queued: Vec<usize> = Vec::new();
    for i in order {
        let id = snapshot.paths[i].target.id;
        if live_ids.contains(&id) && !claimed.contains(&id) {
            claimed.push(id);
        } else {
            queued.push(i);
        }
    }
    queued.sort_unstable();

    let mut free = live_ids.iter().copied().filter(|id| !claimed.contains(id));
    let mut plan = CloneRemap::default();
    for i in queued {
        let from = snapshot.paths[i].target.id;
        match free.next() {
            Some(to) => plan.substitutions.push(TargetSubstitution {
                path_index: i,
                from,
                to,
            }),
            None => {
                warn!(path = i, target = from, "No free live target id for cloned path");
                plan.unresolved.push((i, from));
            }
        }
    }
    debug!(
        substituted = plan.substitutions.len(),
        unresolved = plan.unresolved.len(),
        "Clone remap planned"
    );
    plan
}
