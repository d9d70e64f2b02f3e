//! In-memory persistence gateway.
//!
//! Plays the role of the relational store for tests and for embedding the
//! engine without a database. All operations complete under one mutex, so
//! `apply_changes` is trivially atomic.

use super::{NewItem, PersistError, PersistResult, PersistenceGateway, PlaylistUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vidsync_types::{
    Playlist, PlaylistId, PlaylistItem, ScheduleEntry, SyncHistoryRecord, SyncStatus, VideoId,
    VideoMeta,
};

/// In-memory persistence gateway.
///
/// Clones share state, so a test can keep a handle for seeding and
/// inspection while the engine owns another.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    playlists: HashMap<PlaylistId, Playlist>,
    items: HashMap<PlaylistId, Vec<PlaylistItem>>,
    videos: HashMap<VideoId, VideoMeta>,
    history: Vec<SyncHistoryRecord>,
    schedules: HashMap<PlaylistId, ScheduleEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a playlist record (normally done by the request layer).
    pub fn insert_playlist(&self, playlist: Playlist) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.entry(playlist.id.clone()).or_default();
        inner.playlists.insert(playlist.id.clone(), playlist);
    }

    /// Seed playlist items directly (for tests that need prior local state).
    pub fn insert_items(&self, id: &PlaylistId, items: Vec<PlaylistItem>) {
        self.inner.lock().unwrap().items.insert(id.clone(), items);
    }

    /// All items of a playlist, tombstones included.
    pub fn items(&self, id: &PlaylistId) -> Vec<PlaylistItem> {
        self.inner
            .lock()
            .unwrap()
            .items
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stored metadata for one video.
    pub fn video(&self, id: &VideoId) -> Option<VideoMeta> {
        self.inner.lock().unwrap().videos.get(id).cloned()
    }

    /// Total number of history records across all playlists.
    pub fn history_len(&self) -> usize {
        self.inner.lock().unwrap().history.len()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PersistenceGateway for MemoryStore {
    async fn load_playlist(&self, id: &PlaylistId) -> PersistResult<Option<Playlist>> {
        Ok(self.inner.lock().unwrap().playlists.get(id).cloned())
    }

    async fn load_snapshot(&self, id: &PlaylistId) -> PersistResult<Vec<VideoId>> {
        let inner = self.inner.lock().unwrap();
        if !inner.playlists.contains_key(id) {
            return Err(PersistError::PlaylistNotFound(id.clone()));
        }
        let mut live: Vec<&PlaylistItem> = inner
            .items
            .get(id)
            .map(|items| items.iter().filter(|item| item.is_live()).collect())
            .unwrap_or_default();
        live.sort_by_key(|item| item.position);
        Ok(live.into_iter().map(|item| item.video_id.clone()).collect())
    }

    async fn load_videos(&self, ids: &[VideoId]) -> PersistResult<Vec<VideoMeta>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.videos.get(id).cloned())
            .collect())
    }

    async fn apply_changes(&self, id: &PlaylistId, update: &PlaylistUpdate) -> PersistResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let playlist = inner
            .playlists
            .get_mut(id)
            .ok_or_else(|| PersistError::PlaylistNotFound(id.clone()))?;

        playlist.title = update.title.clone();
        playlist.item_count = update.item_count;
        playlist.last_synced_at = Some(update.synced_at);
        playlist.status = SyncStatus::Completed;

        let items = inner.items.entry(id.clone()).or_default();

        for removed in &update.removed {
            if let Some(item) = items
                .iter_mut()
                .find(|item| item.is_live() && item.video_id == *removed)
            {
                // Tombstone at the last known position.
                item.removed_at = Some(update.synced_at);
            }
        }

        for NewItem {
            video_id,
            position,
            added_at,
        } in &update.added
        {
            items.push(PlaylistItem {
                video_id: video_id.clone(),
                position: *position,
                added_at: *added_at,
                removed_at: None,
            });
        }

        let positions: HashMap<&VideoId, u32> = update
            .positions
            .iter()
            .map(|(video_id, position)| (video_id, *position))
            .collect();
        for item in items.iter_mut().filter(|item| item.is_live()) {
            if let Some(position) = positions.get(&item.video_id) {
                item.position = *position;
            }
        }

        for meta in &update.metadata {
            inner.videos.insert(meta.id.clone(), meta.clone());
        }

        Ok(())
    }

    async fn update_status(&self, id: &PlaylistId, status: SyncStatus) -> PersistResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let playlist = inner
            .playlists
            .get_mut(id)
            .ok_or_else(|| PersistError::PlaylistNotFound(id.clone()))?;
        playlist.status = status;
        Ok(())
    }

    async fn append_history(&self, record: &SyncHistoryRecord) -> PersistResult<()> {
        self.inner.lock().unwrap().history.push(record.clone());
        Ok(())
    }

    async fn load_history(
        &self,
        id: &PlaylistId,
        limit: usize,
    ) -> PersistResult<Vec<SyncHistoryRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .history
            .iter()
            .rev()
            .filter(|record| record.playlist_id == *id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn load_schedules(&self) -> PersistResult<Vec<ScheduleEntry>> {
        Ok(self.inner.lock().unwrap().schedules.values().cloned().collect())
    }

    async fn load_schedule(&self, id: &PlaylistId) -> PersistResult<Option<ScheduleEntry>> {
        Ok(self.inner.lock().unwrap().schedules.get(id).cloned())
    }

    async fn save_schedule(&self, entry: &ScheduleEntry) -> PersistResult<()> {
        self.inner
            .lock()
            .unwrap()
            .schedules
            .insert(entry.playlist_id.clone(), entry.clone());
        Ok(())
    }

    async fn delete_schedule(&self, id: &PlaylistId) -> PersistResult<()> {
        self.inner.lock().unwrap().schedules.remove(id);
        Ok(())
    }
}
