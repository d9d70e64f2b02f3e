//! One synchronization run, end to end.
//!
//! The orchestrator drives a run through its fixed sequence: reserve the
//! minimal quota up front, fetch playlist metadata and item pages through
//! the cache, batch-fetch video metadata, diff against the persisted
//! snapshot, apply the changes atomically, and append a history record.
//!
//! `Running` is exclusive per playlist: a second trigger fails fast with
//! `SyncInProgress` rather than queueing. The run lock is a drop guard, so
//! it is released on every exit path, panics included. Every run that gets
//! past the lock leaves a history record behind - expected failures are
//! folded into a `Failed` record instead of escaping as errors.

use crate::auth::TokenManager;
use crate::cache::{CachedPayload, Fingerprint, ResponseCache};
use crate::clock::now_unix;
use crate::config::EngineConfig;
use crate::persist::{NewItem, PersistError, PersistenceGateway, PlaylistUpdate};
use crate::quota::SharedQuota;
use crate::remote::{RemoteGateway, RemotePlaylist};
use crate::retry::RetryExecutor;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use vidsync_core::{diff, metadata_upserts};
use vidsync_types::{
    PlaylistId, RunId, SyncError, SyncHistoryRecord, SyncStatus, VideoId, VideoMeta,
};

/// Drives synchronization runs; one instance serves all playlists.
pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteGateway>,
    persist: Arc<dyn PersistenceGateway>,
    tokens: Arc<TokenManager>,
    quota: Arc<SharedQuota>,
    cache: Arc<ResponseCache>,
    retry: RetryExecutor,
    config: EngineConfig,
    /// Playlists with a run currently in flight.
    running: DashMap<PlaylistId, ()>,
}

/// Exclusive run lock for one playlist; releases itself on drop.
struct RunGuard<'a> {
    running: &'a DashMap<PlaylistId, ()>,
    id: PlaylistId,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.remove(&self.id);
    }
}

/// Counts accumulated over one run; partial values survive a failure so
/// the history record reflects whatever was computed before the error.
#[derive(Debug, Default)]
struct RunCounters {
    quota_units: u64,
    added: u32,
    removed: u32,
    reordered: u32,
}

impl SyncOrchestrator {
    /// Wire an orchestrator from its collaborators.
    pub fn new(
        config: EngineConfig,
        remote: Arc<dyn RemoteGateway>,
        persist: Arc<dyn PersistenceGateway>,
        tokens: Arc<TokenManager>,
        quota: Arc<SharedQuota>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        let retry = RetryExecutor::new(&config.retry);
        Self {
            remote,
            persist,
            tokens,
            quota,
            cache,
            retry,
            config,
            running: DashMap::new(),
        }
    }

    /// Whether a run is currently in flight for this playlist.
    pub fn is_running(&self, id: &PlaylistId) -> bool {
        self.running.contains_key(id)
    }

    /// Run one synchronization for a playlist.
    ///
    /// Returns the resulting history record; expected failure classes
    /// (quota denial, remote not-found, exhausted retries) are reported
    /// inside a `Failed` record rather than as errors. The error path is
    /// reserved for `SyncInProgress` and infrastructure failures such as an
    /// unavailable persistence gateway.
    pub async fn sync_playlist(&self, id: &PlaylistId) -> Result<SyncHistoryRecord, SyncError> {
        let _guard = self.acquire(id)?;

        let run_id = RunId::new();
        let started_at = now_unix();
        tracing::info!(playlist = %id, run = %run_id, "sync run started");

        let mut counters = RunCounters::default();
        let outcome = self.run(id, &mut counters).await;
        let completed_at = now_unix();

        let record = match outcome {
            Ok(()) => SyncHistoryRecord {
                id: run_id,
                playlist_id: id.clone(),
                status: SyncStatus::Completed,
                started_at,
                completed_at: Some(completed_at),
                items_added: counters.added,
                items_removed: counters.removed,
                items_reordered: counters.reordered,
                quota_units: counters.quota_units,
                error: None,
            },
            Err(err) => {
                if let Err(status_err) = self.persist.update_status(id, SyncStatus::Failed).await {
                    tracing::warn!(
                        playlist = %id,
                        error = %status_err,
                        "could not record failed status"
                    );
                }
                SyncHistoryRecord {
                    id: run_id,
                    playlist_id: id.clone(),
                    status: SyncStatus::Failed,
                    started_at,
                    completed_at: Some(completed_at),
                    items_added: counters.added,
                    items_removed: counters.removed,
                    items_reordered: counters.reordered,
                    quota_units: counters.quota_units,
                    error: Some(err.to_string()),
                }
            }
        };

        self.persist
            .append_history(&record)
            .await
            .map_err(persist_error)?;

        match record.status {
            SyncStatus::Completed => tracing::info!(
                playlist = %id,
                run = %run_id,
                added = record.items_added,
                removed = record.items_removed,
                reordered = record.items_reordered,
                quota = record.quota_units,
                "sync run completed"
            ),
            _ => tracing::warn!(
                playlist = %id,
                run = %run_id,
                error = record.error.as_deref().unwrap_or(""),
                "sync run failed"
            ),
        }

        Ok(record)
    }

    fn acquire(&self, id: &PlaylistId) -> Result<RunGuard<'_>, SyncError> {
        match self.running.entry(id.clone()) {
            Entry::Occupied(_) => Err(SyncError::SyncInProgress(id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(RunGuard {
                    running: &self.running,
                    id: id.clone(),
                })
            }
        }
    }

    /// The fallible middle of a run. Counters are updated in place so a
    /// failure still reports partial progress.
    async fn run(&self, id: &PlaylistId, counters: &mut RunCounters) -> Result<(), SyncError> {
        let call_cost = self.config.remote.call_cost;

        // Reserve the anticipated minimal call set up front (metadata +
        // first items page + first video batch). Denial fails the run
        // before any remote call is issued.
        let upfront = call_cost * 3;
        self.quota.reserve(upfront)?;
        counters.quota_units += upfront;

        let meta = self.fetch_meta(id).await?;
        let remote_ids = self.fetch_all_item_ids(id, counters).await?;

        // Diff the remote order against the last persisted snapshot.
        let local = self
            .persist
            .load_snapshot(id)
            .await
            .map_err(persist_error)?;
        let changes = diff(&local, &remote_ids);
        counters.added = changes.added.len() as u32;
        counters.removed = changes.removed.len() as u32;
        counters.reordered = changes.reordered.len() as u32;

        // Video metadata for the final member set.
        let fetched = self.fetch_videos(&changes.order, counters).await?;
        let stored: HashMap<VideoId, VideoMeta> = self
            .persist
            .load_videos(&changes.order)
            .await
            .map_err(persist_error)?
            .into_iter()
            .map(|meta| (meta.id.clone(), meta))
            .collect();
        let upserts = metadata_upserts(&stored, &fetched);

        // Apply everything atomically together with last_synced_at and the
        // terminal status. Not a cancellation point: one gateway call that
        // either lands or does not.
        let synced_at = now_unix();
        let update = PlaylistUpdate {
            title: meta.title,
            item_count: changes.order.len() as u32,
            added: changes
                .added
                .iter()
                .map(|addition| NewItem {
                    video_id: addition.video_id.clone(),
                    position: addition.position,
                    added_at: synced_at,
                })
                .collect(),
            removed: changes.removed.clone(),
            positions: changes
                .order
                .iter()
                .enumerate()
                .map(|(position, video_id)| (video_id.clone(), position as u32))
                .collect(),
            metadata: upserts,
            synced_at,
        };
        self.persist
            .apply_changes(id, &update)
            .await
            .map_err(persist_error)?;

        Ok(())
    }

    /// Playlist metadata, read through the cache. The call is covered by
    /// the upfront reservation, so a miss charges nothing extra.
    async fn fetch_meta(&self, id: &PlaylistId) -> Result<RemotePlaylist, SyncError> {
        let fingerprint = Fingerprint::compute("playlist_meta", &[id.as_str()]);
        if let Some(CachedPayload::PlaylistMeta(meta)) = self.cache.get(&fingerprint) {
            return Ok(meta);
        }

        let remote = Arc::clone(&self.remote);
        let playlist_id = id.clone();
        let meta = self
            .retry
            .execute(&self.tokens, move |access| {
                let remote = Arc::clone(&remote);
                let playlist_id = playlist_id.clone();
                async move { remote.fetch_playlist_meta(&access, &playlist_id).await }
            })
            .await?;

        self.cache.insert(
            fingerprint,
            CachedPayload::PlaylistMeta(meta.clone()),
            Duration::from_secs(self.config.cache.playlist_meta_ttl_secs),
        );
        Ok(meta)
    }

    /// Every item id of the playlist, following continuation tokens. The
    /// first page rides on the upfront reservation; later pages reserve a
    /// unit each, and only on cache miss.
    async fn fetch_all_item_ids(
        &self,
        id: &PlaylistId,
        counters: &mut RunCounters,
    ) -> Result<Vec<VideoId>, SyncError> {
        let ttl = Duration::from_secs(self.config.cache.items_page_ttl_secs);
        let call_cost = self.config.remote.call_cost;
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_index = 0usize;

        loop {
            let token_param = page_token.clone().unwrap_or_default();
            let fingerprint =
                Fingerprint::compute("playlist_items", &[id.as_str(), &token_param]);

            let page = match self.cache.get(&fingerprint) {
                Some(CachedPayload::ItemsPage(page)) => page,
                _ => {
                    if page_index > 0 {
                        self.quota.reserve(call_cost)?;
                        counters.quota_units += call_cost;
                    }

                    let remote = Arc::clone(&self.remote);
                    let playlist_id = id.clone();
                    let continuation = page_token.clone();
                    let page = self
                        .retry
                        .execute(&self.tokens, move |access| {
                            let remote = Arc::clone(&remote);
                            let playlist_id = playlist_id.clone();
                            let continuation = continuation.clone();
                            async move {
                                remote
                                    .fetch_playlist_items(
                                        &access,
                                        &playlist_id,
                                        continuation.as_deref(),
                                    )
                                    .await
                            }
                        })
                        .await?;

                    self.cache
                        .insert(fingerprint, CachedPayload::ItemsPage(page.clone()), ttl);
                    page
                }
            };

            ids.extend(page.items.iter().map(|item| item.video_id.clone()));
            page_index += 1;

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(ids)
    }

    /// Video metadata for the member set, batched up to the platform
    /// maximum. The first batch rides on the upfront reservation; later
    /// batches reserve a unit each, and only on cache miss.
    async fn fetch_videos(
        &self,
        ids: &[VideoId],
        counters: &mut RunCounters,
    ) -> Result<Vec<VideoMeta>, SyncError> {
        let ttl = Duration::from_secs(self.config.cache.video_batch_ttl_secs);
        let call_cost = self.config.remote.call_cost;
        let batch_size = self.config.remote.batch_size.max(1);
        let mut fetched = Vec::with_capacity(ids.len());

        for (batch_index, chunk) in ids.chunks(batch_size).enumerate() {
            let id_params: Vec<&str> = chunk.iter().map(|video_id| video_id.as_str()).collect();
            let fingerprint = Fingerprint::compute("video_batch", &id_params);

            match self.cache.get(&fingerprint) {
                Some(CachedPayload::VideoBatch(batch)) => fetched.extend(batch),
                _ => {
                    if batch_index > 0 {
                        self.quota.reserve(call_cost)?;
                        counters.quota_units += call_cost;
                    }

                    let remote = Arc::clone(&self.remote);
                    let batch_ids: Vec<VideoId> = chunk.to_vec();
                    let batch = self
                        .retry
                        .execute(&self.tokens, move |access| {
                            let remote = Arc::clone(&remote);
                            let batch_ids = batch_ids.clone();
                            async move { remote.fetch_videos(&access, &batch_ids).await }
                        })
                        .await?;

                    self.cache
                        .insert(fingerprint, CachedPayload::VideoBatch(batch.clone()), ttl);
                    fetched.extend(batch);
                }
            }
        }

        Ok(fetched)
    }
}

fn persist_error(err: PersistError) -> SyncError {
    SyncError::Persistence(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthProvider;
    use crate::persist::MemoryStore;
    use crate::remote::MockRemoteGateway;

    fn orchestrator() -> SyncOrchestrator {
        let config = EngineConfig::default();
        let tokens = Arc::new(TokenManager::new(
            Arc::new(MockAuthProvider::new()),
            Duration::from_secs(300),
        ));
        SyncOrchestrator::new(
            config.clone(),
            Arc::new(MockRemoteGateway::new()),
            Arc::new(MemoryStore::new()),
            tokens,
            Arc::new(SharedQuota::new(config.quota.daily_limit)),
            Arc::new(ResponseCache::new()),
        )
    }

    #[test]
    fn run_lock_is_exclusive_and_released_on_drop() {
        let orch = orchestrator();
        let id = PlaylistId::new("PL1");

        let guard = orch.acquire(&id).unwrap();
        assert!(orch.is_running(&id));
        assert!(matches!(
            orch.acquire(&id),
            Err(SyncError::SyncInProgress(_))
        ));

        drop(guard);
        assert!(!orch.is_running(&id));
        // Reacquiring after release works.
        let _guard = orch.acquire(&id).unwrap();
    }

    #[test]
    fn locks_are_per_playlist() {
        let orch = orchestrator();
        let _a = orch.acquire(&PlaylistId::new("PL1")).unwrap();
        // A different playlist is unaffected.
        let _b = orch.acquire(&PlaylistId::new("PL2")).unwrap();
    }
}
