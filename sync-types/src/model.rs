//! Synchronized records and engine bookkeeping types.
//!
//! Timestamps are unix seconds (`i64`) throughout; the engine passes clocks
//! in explicitly so these records stay inert data.

use crate::ids::{ChannelId, PlaylistId, RunId, VideoId};
use serde::{Deserialize, Serialize};

/// Synchronization status of a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Never synced, or sync state reset.
    Idle,
    /// A sync run is currently executing.
    Running,
    /// The last sync run completed successfully.
    Completed,
    /// The last sync run terminated with an error.
    Failed,
}

impl SyncStatus {
    /// Status as a lowercase string, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A curated playlist tracked by the local store.
///
/// Created on import; mutated only by the orchestrator after a completed
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Remote playlist id.
    pub id: PlaylistId,
    /// Playlist title as of the last sync.
    pub title: String,
    /// Owning channel.
    pub channel_id: ChannelId,
    /// Number of live (non-tombstoned) items.
    pub item_count: u32,
    /// Unix timestamp of the last completed sync, if any.
    pub last_synced_at: Option<i64>,
    /// Terminal status of the most recent run.
    pub status: SyncStatus,
}

/// Membership of one video in one playlist.
///
/// Positions are 0-based and dense within the live set. Removal tombstones
/// the item (`removed_at` set) instead of deleting it, preserving history
/// for audit and undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// The member video.
    pub video_id: VideoId,
    /// 0-based position within the playlist.
    pub position: u32,
    /// Unix timestamp when the item was first seen in the playlist.
    pub added_at: i64,
    /// Tombstone timestamp; `None` for live items.
    pub removed_at: Option<i64>,
}

impl PlaylistItem {
    /// Whether this item is still a live member of the playlist.
    pub fn is_live(&self) -> bool {
        self.removed_at.is_none()
    }
}

/// Thumbnail URLs for a video, by size class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnails {
    /// Default-size thumbnail URL.
    pub default: Option<String>,
    /// Medium-size thumbnail URL.
    pub medium: Option<String>,
    /// High-resolution thumbnail URL.
    pub high: Option<String>,
}

/// Metadata of a single video.
///
/// Upserted whenever fetched; identity is the video id and the record is
/// never recreated under a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMeta {
    /// Remote video id.
    pub id: VideoId,
    /// Video title.
    pub title: String,
    /// Uploading channel.
    pub channel_id: ChannelId,
    /// Uploading channel's display name.
    pub channel_title: String,
    /// Duration in seconds.
    pub duration_secs: u32,
    /// Thumbnail set.
    pub thumbnails: Thumbnails,
    /// View counter as of the last fetch.
    pub view_count: u64,
    /// Like counter as of the last fetch.
    pub like_count: u64,
    /// Unix timestamp the video was published.
    pub published_at: i64,
}

/// Record of one orchestrator run. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncHistoryRecord {
    /// Run identifier.
    pub id: RunId,
    /// Playlist that was synced.
    pub playlist_id: PlaylistId,
    /// Terminal status of the run (`Completed` or `Failed`).
    pub status: SyncStatus,
    /// Unix timestamp the run started.
    pub started_at: i64,
    /// Unix timestamp the run reached a terminal state.
    pub completed_at: Option<i64>,
    /// Items added by this run.
    pub items_added: u32,
    /// Items tombstoned by this run.
    pub items_removed: u32,
    /// Items whose position was rewritten by this run.
    pub items_reordered: u32,
    /// Quota units consumed by this run.
    pub quota_units: u64,
    /// Error detail for failed runs.
    pub error: Option<String>,
}

/// A recurring sync schedule for one playlist.
///
/// Keyed by playlist id: at most one schedule per playlist. The request
/// layer creates/updates/deletes entries; the scheduler alone mutates
/// `last_run_at`, `next_run_at`, and `retry_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Playlist this schedule drives.
    pub playlist_id: PlaylistId,
    /// Interval between successful runs, in seconds (>= 60).
    pub interval_secs: u64,
    /// Disabled entries are never selected by the scheduler.
    pub enabled: bool,
    /// Unix timestamp of the last run, if any.
    pub last_run_at: Option<i64>,
    /// Unix timestamp when the next run is due.
    pub next_run_at: i64,
    /// Consecutive failures since the last success.
    pub retry_count: u32,
    /// Failure budget before the scheduler falls back to the full interval.
    pub max_retries: u32,
}

/// Snapshot of quota consumption for the current UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Units consumed so far today.
    pub used: u64,
    /// Configured daily limit.
    pub limit: u64,
    /// Units still available today.
    pub remaining: u64,
    /// Unix timestamp of the next UTC midnight, when the bucket resets.
    pub reset_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&SyncStatus::Completed).unwrap();
        assert_eq!(json, r#""completed""#);
        let back: SyncStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SyncStatus::Completed);
    }

    #[test]
    fn status_display_matches_as_str() {
        for status in [
            SyncStatus::Idle,
            SyncStatus::Running,
            SyncStatus::Completed,
            SyncStatus::Failed,
        ] {
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn tombstoned_item_is_not_live() {
        let mut item = PlaylistItem {
            video_id: VideoId::new("v1"),
            position: 0,
            added_at: 1_700_000_000,
            removed_at: None,
        };
        assert!(item.is_live());

        item.removed_at = Some(1_700_000_100);
        assert!(!item.is_live());
    }

    #[test]
    fn history_record_serializes() {
        let record = SyncHistoryRecord {
            id: RunId::new(),
            playlist_id: PlaylistId::new("PL1"),
            status: SyncStatus::Failed,
            started_at: 1_700_000_000,
            completed_at: Some(1_700_000_005),
            items_added: 0,
            items_removed: 0,
            items_reordered: 0,
            quota_units: 3,
            error: Some("network error: timeout".into()),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: SyncHistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
