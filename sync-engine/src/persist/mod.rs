//! Persistence gateway abstraction.
//!
//! The relational store is an external collaborator: the engine only needs
//! the operations below and never sees the schema behind them. Changes from
//! one reconciliation are applied through a single atomic call so a crash
//! can never leave positions half-rewritten without a matching history
//! record.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use vidsync_types::{
    Playlist, PlaylistId, ScheduleEntry, SyncHistoryRecord, SyncStatus, VideoId, VideoMeta,
};

/// Persistence layer errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PersistError {
    /// The playlist has not been imported into the local store.
    #[error("playlist not found: {0}")]
    PlaylistNotFound(PlaylistId),

    /// Backend failure (connection lost, constraint violation, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type alias for persistence operations.
pub type PersistResult<T> = std::result::Result<T, PersistError>;

/// A new playlist member produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    /// The added video.
    pub video_id: VideoId,
    /// 0-based position in the final order.
    pub position: u32,
    /// Unix timestamp the addition was observed.
    pub added_at: i64,
}

/// The full outcome of one completed reconciliation, applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistUpdate {
    /// Playlist title as fetched.
    pub title: String,
    /// Live item count after this update.
    pub item_count: u32,
    /// Items to create.
    pub added: Vec<NewItem>,
    /// Items to tombstone at their last known position.
    pub removed: Vec<VideoId>,
    /// Dense final positions for every live item, additions included.
    pub positions: Vec<(VideoId, u32)>,
    /// Video metadata records to upsert.
    pub metadata: Vec<VideoMeta>,
    /// Timestamp recorded as `last_synced_at` and on new tombstones.
    pub synced_at: i64,
}

/// Storage operations the engine requires from its persistence layer.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Load a playlist record.
    async fn load_playlist(&self, id: &PlaylistId) -> PersistResult<Option<Playlist>>;

    /// Load the ordered live (non-tombstoned) item ids of a playlist.
    async fn load_snapshot(&self, id: &PlaylistId) -> PersistResult<Vec<VideoId>>;

    /// Load stored video metadata for the given ids; unknown ids are
    /// omitted.
    async fn load_videos(&self, ids: &[VideoId]) -> PersistResult<Vec<VideoMeta>>;

    /// Apply one reconciliation outcome atomically: adds, tombstones,
    /// position rewrites, metadata upserts, and the playlist row update
    /// (`last_synced_at`, `status = Completed`).
    async fn apply_changes(&self, id: &PlaylistId, update: &PlaylistUpdate) -> PersistResult<()>;

    /// Record a terminal status without touching items (failed runs).
    async fn update_status(&self, id: &PlaylistId, status: SyncStatus) -> PersistResult<()>;

    /// Append one run record to the playlist's history.
    async fn append_history(&self, record: &SyncHistoryRecord) -> PersistResult<()>;

    /// Load up to `limit` history records for a playlist, newest first.
    async fn load_history(
        &self,
        id: &PlaylistId,
        limit: usize,
    ) -> PersistResult<Vec<SyncHistoryRecord>>;

    /// Load every schedule entry.
    async fn load_schedules(&self) -> PersistResult<Vec<ScheduleEntry>>;

    /// Load the schedule entry for one playlist.
    async fn load_schedule(&self, id: &PlaylistId) -> PersistResult<Option<ScheduleEntry>>;

    /// Create or replace the schedule entry for its playlist.
    async fn save_schedule(&self, entry: &ScheduleEntry) -> PersistResult<()>;

    /// Delete the schedule entry for a playlist, if any.
    async fn delete_schedule(&self, id: &PlaylistId) -> PersistResult<()>;
}
