//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use vidsync_engine::{
    Credentials, EngineConfig, MemoryStore, MockAuthProvider, MockRemoteGateway, RemoteItem,
    RemotePlaylist, SyncService,
};
use vidsync_types::{ChannelId, Playlist, PlaylistId, SyncStatus, Thumbnails, VideoId, VideoMeta};

/// A fully wired service with handles on every mock collaborator.
pub struct Harness {
    pub service: SyncService,
    pub remote: MockRemoteGateway,
    pub store: MemoryStore,
    pub auth: MockAuthProvider,
}

/// Current unix timestamp in seconds.
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Harness with the default engine configuration.
pub async fn harness() -> Harness {
    harness_with(EngineConfig::default()).await
}

/// Harness with a custom configuration; credentials are pre-seeded so no
/// refresh is needed unless a test provokes one.
pub async fn harness_with(config: EngineConfig) -> Harness {
    let remote = MockRemoteGateway::new();
    let store = MemoryStore::new();
    let auth = MockAuthProvider::new();

    let service = SyncService::new(
        config,
        Arc::new(remote.clone()),
        Arc::new(store.clone()),
        Arc::new(auth.clone()),
    );
    service
        .tokens()
        .initialize(Credentials {
            access_token: "seed-token".into(),
            refresh_token: "seed-refresh".into(),
            expires_at: now_unix() + 3600,
        })
        .await;

    Harness {
        service,
        remote,
        store,
        auth,
    }
}

/// Configuration whose cache TTLs are all zero, so every sync hits the
/// remote (useful when a test mutates the scripted remote between runs).
pub fn zero_ttl_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.cache.playlist_meta_ttl_secs = 0;
    config.cache.items_page_ttl_secs = 0;
    config.cache.video_batch_ttl_secs = 0;
    config
}

pub fn playlist_id(id: &str) -> PlaylistId {
    PlaylistId::new(id)
}

/// Import a playlist row the way the request layer would.
pub fn import_playlist(store: &MemoryStore, id: &str) {
    store.insert_playlist(Playlist {
        id: PlaylistId::new(id),
        title: "imported".into(),
        channel_id: ChannelId::new("UC1"),
        item_count: 0,
        last_synced_at: None,
        status: SyncStatus::Idle,
    });
}

/// Script the remote to serve one playlist with a single items page and
/// metadata for every member video.
pub fn script_remote(remote: &MockRemoteGateway, id: &str, title: &str, videos: &[&str]) {
    remote.set_playlist(RemotePlaylist {
        id: PlaylistId::new(id),
        title: title.into(),
        channel_id: ChannelId::new("UC1"),
        item_count: videos.len() as u32,
    });
    remote.set_items(&PlaylistId::new(id), vec![items_page(videos, 0)]);
    for video in videos {
        remote.set_video(video_meta(video));
    }
}

/// Build one items page with positions starting at `offset`.
pub fn items_page(videos: &[&str], offset: u32) -> Vec<RemoteItem> {
    videos
        .iter()
        .enumerate()
        .map(|(index, video)| RemoteItem {
            video_id: VideoId::new(*video),
            position: offset + index as u32,
        })
        .collect()
}

/// Plausible video metadata for a scripted id.
pub fn video_meta(id: &str) -> VideoMeta {
    VideoMeta {
        id: VideoId::new(id),
        title: format!("video {id}"),
        channel_id: ChannelId::new("UC1"),
        channel_title: "test channel".into(),
        duration_secs: 240,
        thumbnails: Thumbnails {
            default: Some(format!("https://img.example/{id}/default.jpg")),
            medium: Some(format!("https://img.example/{id}/medium.jpg")),
            high: None,
        },
        view_count: 1_000,
        like_count: 50,
        published_at: 1_690_000_000,
    }
}

/// The live snapshot as plain strings, for terse assertions.
pub async fn snapshot(store: &MemoryStore, id: &str) -> Vec<String> {
    use vidsync_engine::PersistenceGateway;
    store
        .load_snapshot(&PlaylistId::new(id))
        .await
        .unwrap()
        .into_iter()
        .map(|video| video.as_str().to_string())
        .collect()
}
