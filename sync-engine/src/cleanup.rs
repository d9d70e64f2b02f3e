//! Background expiry sweep for the response cache.
//!
//! Lookups already drop stale entries they touch; this task sweeps the
//! rest so fingerprints that are never queried again do not pin memory.

use crate::cache::ResponseCache;
use crate::config::CacheConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn the background cache purge task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cache_purge_task(
    cache: Arc<ResponseCache>,
    config: CacheConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval_secs = config.purge_interval_secs;
        tracing::info!("Cache purge task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;

            let dropped = cache.purge_expired();
            if dropped > 0 {
                tracing::debug!("Cache purge: dropped {} expired entries", dropped);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachedPayload, Fingerprint};
    use crate::remote::RemotePlaylist;
    use vidsync_types::{ChannelId, PlaylistId};

    #[tokio::test(start_paused = true)]
    async fn purge_task_sweeps_expired_entries() {
        let cache = Arc::new(ResponseCache::new());
        cache.insert(
            Fingerprint::compute("playlist_meta", &["PL1"]),
            CachedPayload::PlaylistMeta(RemotePlaylist {
                id: PlaylistId::new("PL1"),
                title: "t".into(),
                channel_id: ChannelId::new("UC1"),
                item_count: 0,
            }),
            // Already expired on insert; the paused clock only advances
            // tokio's timers, not std::time::Instant.
            Duration::ZERO,
        );
        assert_eq!(cache.len(), 1);

        let handle = spawn_cache_purge_task(
            Arc::clone(&cache),
            CacheConfig {
                purge_interval_secs: 1,
                ..CacheConfig::default()
            },
        );

        // Let the task pass its first interval.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(cache.is_empty());

        handle.abort();
    }
}
