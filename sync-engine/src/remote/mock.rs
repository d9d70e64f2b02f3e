//! Mock remote gateway for testing.
//!
//! Allows scripting playlist contents, injecting failures per operation,
//! and verifying call counts and the access tokens presented.

use super::{RemoteGateway, RemoteItem, RemoteItemsPage, RemotePlaylist};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidsync_types::{PlaylistId, SyncError, VideoId, VideoMeta};

/// Mock remote gateway for testing.
///
/// Clones share state, so a test can keep a handle for scripting while the
/// engine owns another.
#[derive(Debug, Default)]
pub struct MockRemoteGateway {
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug, Default)]
struct MockRemoteInner {
    playlists: HashMap<PlaylistId, RemotePlaylist>,
    pages: HashMap<PlaylistId, Vec<RemoteItemsPage>>,
    videos: HashMap<VideoId, VideoMeta>,
    fail_meta: VecDeque<SyncError>,
    fail_items: VecDeque<SyncError>,
    fail_videos: VecDeque<SyncError>,
    meta_calls: u32,
    items_calls: u32,
    videos_calls: u32,
    seen_tokens: Vec<String>,
    delay: Option<Duration>,
}

impl MockRemoteGateway {
    /// Create an empty mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the metadata returned for a playlist.
    pub fn set_playlist(&self, playlist: RemotePlaylist) {
        let mut inner = self.inner.lock().unwrap();
        inner.playlists.insert(playlist.id.clone(), playlist);
    }

    /// Script the item pages for a playlist.
    ///
    /// Pages are chained automatically: each page except the last gets a
    /// continuation token pointing at the next.
    pub fn set_items(&self, id: &PlaylistId, pages: Vec<Vec<RemoteItem>>) {
        let count = pages.len();
        let chained = pages
            .into_iter()
            .enumerate()
            .map(|(idx, items)| RemoteItemsPage {
                items,
                next_page_token: (idx + 1 < count).then(|| format!("page-{}", idx + 1)),
            })
            .collect();
        let mut inner = self.inner.lock().unwrap();
        inner.pages.insert(id.clone(), chained);
    }

    /// Script the metadata returned for a video.
    pub fn set_video(&self, meta: VideoMeta) {
        let mut inner = self.inner.lock().unwrap();
        inner.videos.insert(meta.id.clone(), meta);
    }

    /// Queue an error for an upcoming `fetch_playlist_meta` call.
    pub fn fail_next_meta(&self, err: SyncError) {
        self.inner.lock().unwrap().fail_meta.push_back(err);
    }

    /// Queue an error for an upcoming `fetch_playlist_items` call.
    pub fn fail_next_items(&self, err: SyncError) {
        self.inner.lock().unwrap().fail_items.push_back(err);
    }

    /// Queue an error for an upcoming `fetch_videos` call.
    pub fn fail_next_videos(&self, err: SyncError) {
        self.inner.lock().unwrap().fail_videos.push_back(err);
    }

    /// Delay every call by `duration` (for overlap tests).
    pub fn set_delay(&self, duration: Duration) {
        self.inner.lock().unwrap().delay = Some(duration);
    }

    /// Number of `fetch_playlist_meta` calls so far.
    pub fn meta_calls(&self) -> u32 {
        self.inner.lock().unwrap().meta_calls
    }

    /// Number of `fetch_playlist_items` calls so far.
    pub fn items_calls(&self) -> u32 {
        self.inner.lock().unwrap().items_calls
    }

    /// Number of `fetch_videos` calls so far.
    pub fn videos_calls(&self) -> u32 {
        self.inner.lock().unwrap().videos_calls
    }

    /// Access tokens presented across all calls, in order.
    pub fn seen_tokens(&self) -> Vec<String> {
        self.inner.lock().unwrap().seen_tokens.clone()
    }

    fn delay_duration(&self) -> Option<Duration> {
        self.inner.lock().unwrap().delay
    }

    async fn apply_delay(&self) {
        if let Some(delay) = self.delay_duration() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Clone for MockRemoteGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RemoteGateway for MockRemoteGateway {
    async fn fetch_playlist_meta(
        &self,
        access_token: &str,
        id: &PlaylistId,
    ) -> Result<RemotePlaylist, SyncError> {
        self.apply_delay().await;
        let mut inner = self.inner.lock().unwrap();
        inner.meta_calls += 1;
        inner.seen_tokens.push(access_token.to_string());

        if let Some(err) = inner.fail_meta.pop_front() {
            return Err(err);
        }

        inner
            .playlists
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("playlist {id}")))
    }

    async fn fetch_playlist_items(
        &self,
        access_token: &str,
        id: &PlaylistId,
        page_token: Option<&str>,
    ) -> Result<RemoteItemsPage, SyncError> {
        self.apply_delay().await;
        let mut inner = self.inner.lock().unwrap();
        inner.items_calls += 1;
        inner.seen_tokens.push(access_token.to_string());

        if let Some(err) = inner.fail_items.pop_front() {
            return Err(err);
        }

        let pages = inner
            .pages
            .get(id)
            .ok_or_else(|| SyncError::NotFound(format!("playlist {id}")))?;

        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| SyncError::NotFound(format!("page token {token}")))?,
        };

        pages
            .get(index)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("page {index} of playlist {id}")))
    }

    async fn fetch_videos(
        &self,
        access_token: &str,
        ids: &[VideoId],
    ) -> Result<Vec<VideoMeta>, SyncError> {
        self.apply_delay().await;
        let mut inner = self.inner.lock().unwrap();
        inner.videos_calls += 1;
        inner.seen_tokens.push(access_token.to_string());

        if let Some(err) = inner.fail_videos.pop_front() {
            return Err(err);
        }

        // Unknown ids are omitted, matching platform behavior.
        Ok(ids
            .iter()
            .filter_map(|id| inner.videos.get(id).cloned())
            .collect())
    }
}
