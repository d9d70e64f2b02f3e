//! Remote gateway abstraction.
//!
//! The engine never speaks the platform's wire protocol itself; it depends
//! on a thin typed client behind the [`RemoteGateway`] trait. New sources
//! register additional implementations behind the same interface.
//!
//! Every method corresponds to one billable remote call; the orchestrator
//! reserves quota before invoking and the retry executor supplies the
//! access token, so implementations only translate requests and responses.

mod mock;

pub use mock::MockRemoteGateway;

use async_trait::async_trait;
use vidsync_types::{ChannelId, PlaylistId, SyncError, VideoId, VideoMeta};

/// Playlist metadata as reported by the remote platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlaylist {
    /// Remote playlist id.
    pub id: PlaylistId,
    /// Current playlist title.
    pub title: String,
    /// Owning channel.
    pub channel_id: ChannelId,
    /// Item count as reported by the remote; pages are still fetched in
    /// full, this is informational.
    pub item_count: u32,
}

/// One member entry in a playlist items page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// The member video.
    pub video_id: VideoId,
    /// 0-based position reported by the remote.
    pub position: u32,
}

/// One page of playlist items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItemsPage {
    /// Items in remote order.
    pub items: Vec<RemoteItem>,
    /// Continuation token; `None` on the last page.
    pub next_page_token: Option<String>,
}

/// Typed client for the remote video platform.
///
/// Implementations perform the actual paginated fetches; the engine owns
/// caching, quota, retry, and authorization around them.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Fetch metadata for one playlist.
    async fn fetch_playlist_meta(
        &self,
        access_token: &str,
        id: &PlaylistId,
    ) -> Result<RemotePlaylist, SyncError>;

    /// Fetch one page of playlist items.
    ///
    /// `page_token` is `None` for the first page; subsequent pages pass the
    /// previous page's continuation token.
    async fn fetch_playlist_items(
        &self,
        access_token: &str,
        id: &PlaylistId,
        page_token: Option<&str>,
    ) -> Result<RemoteItemsPage, SyncError>;

    /// Fetch metadata for up to the platform's batch maximum of videos.
    ///
    /// Ids unknown to the remote are omitted from the response rather than
    /// failing the batch.
    async fn fetch_videos(
        &self,
        access_token: &str,
        ids: &[VideoId],
    ) -> Result<Vec<VideoMeta>, SyncError>;
}
