//! Reconciliation of a remote playlist snapshot against the local snapshot.
//!
//! This module computes, from two ordered id sequences, the minimal set of
//! changes the orchestrator must persist: additions, removals (tombstones),
//! position corrections, and the final dense order. It is pure - all
//! fetching happens upstream - so every property is directly unit-testable.
//!
//! ## Reorder detection
//!
//! Raw positions shift whenever anything is inserted or removed above an
//! item, so diffing raw positions reports churn for items whose relative
//! order never changed. Instead, both sequences are restricted to the ids
//! they have in common, and an id counts as reordered only when its index
//! *within that restriction* differs between local and remote. An insertion
//! or removal elsewhere in the playlist therefore reorders nothing, while a
//! genuine swap reports exactly the ids that moved relative to their peers.

use std::collections::{HashMap, HashSet};
use vidsync_types::{VideoId, VideoMeta};

/// A video to be added to the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addition {
    /// The new member video.
    pub video_id: VideoId,
    /// 0-based position in the final stored order.
    pub position: u32,
}

/// Result of reconciling local state against a remote snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Remote ids absent from local, in remote order.
    pub added: Vec<Addition>,
    /// Local ids absent from remote, in local order. Tombstoned, not deleted.
    pub removed: Vec<VideoId>,
    /// Ids present in both whose order relative to their common peers
    /// changed. Their positions must be corrected.
    pub reordered: Vec<VideoId>,
    /// The final stored order: exactly the remote order. Persisting
    /// positions `0..order.len()` in this sequence restores density.
    pub order: Vec<VideoId>,
}

impl Diff {
    /// True when local already matches remote exactly.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.reordered.is_empty()
    }
}

/// Compute the change set between the local and remote item sequences.
///
/// Both inputs are ordered sequences of stable external ids. Duplicate ids
/// within one sequence are collapsed first-occurrence-wins before diffing;
/// the remote platform treats a playlist as an ordered set and so do we.
pub fn diff(local: &[VideoId], remote: &[VideoId]) -> Diff {
    let local = dedupe(local);
    let remote = dedupe(remote);

    let local_set: HashSet<&VideoId> = local.iter().collect();
    let remote_set: HashSet<&VideoId> = remote.iter().collect();

    let added = remote
        .iter()
        .enumerate()
        .filter(|(_, id)| !local_set.contains(id))
        .map(|(position, id)| Addition {
            video_id: id.clone(),
            position: position as u32,
        })
        .collect();

    let removed = local
        .iter()
        .filter(|id| !remote_set.contains(id))
        .cloned()
        .collect();

    // Restrict both sequences to the common ids, then compare each id's
    // index within the restriction. Equal indices mean the id kept its
    // order relative to every other surviving item.
    let common_local: Vec<&VideoId> = local
        .iter()
        .filter(|id| remote_set.contains(id))
        .collect();
    let common_remote: Vec<&VideoId> = remote
        .iter()
        .filter(|id| local_set.contains(id))
        .collect();

    let local_index: HashMap<&VideoId, usize> = common_local
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    let reordered = common_remote
        .iter()
        .enumerate()
        .filter(|(remote_idx, id)| local_index[*id] != *remote_idx)
        .map(|(_, id)| (*id).clone())
        .collect();

    Diff {
        added,
        removed,
        reordered,
        order: remote,
    }
}

/// Select the fetched metadata records that must be upserted.
///
/// Metadata reconciliation is independent of ordering: any video whose
/// fetched metadata differs from the stored record (or that has no stored
/// record yet) is upserted, whether or not its position changed.
pub fn metadata_upserts(
    stored: &HashMap<VideoId, VideoMeta>,
    fetched: &[VideoMeta],
) -> Vec<VideoMeta> {
    fetched
        .iter()
        .filter(|meta| stored.get(&meta.id) != Some(*meta))
        .cloned()
        .collect()
}

fn dedupe(ids: &[VideoId]) -> Vec<VideoId> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}
