//! Request-layer facade over the engine.
//!
//! [`SyncService`] wires the shared components (quota, cache, token
//! manager, orchestrator) from configuration plus the three external
//! collaborators, and exposes the operations the request layer needs:
//! manual triggers, status and history reads, quota usage, schedule CRUD,
//! and background task spawning. Schedule input is validated here, before
//! anything touches the engine.

use crate::auth::{AuthProvider, TokenManager};
use crate::cache::ResponseCache;
use crate::cleanup::spawn_cache_purge_task;
use crate::clock::now_unix;
use crate::config::EngineConfig;
use crate::orchestrator::SyncOrchestrator;
use crate::persist::{PersistError, PersistenceGateway};
use crate::quota::SharedQuota;
use crate::remote::RemoteGateway;
use crate::scheduler::spawn_scheduler;
use std::sync::Arc;
use std::time::Duration;
use vidsync_core::validate_interval;
use vidsync_types::{
    PlaylistId, QuotaUsage, ScheduleEntry, SyncError, SyncHistoryRecord, SyncStatus,
};

/// Point-in-time view of one playlist's sync state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistStatus {
    /// Terminal status of the most recent run.
    pub status: SyncStatus,
    /// Unix timestamp of the last completed sync, if any.
    pub last_synced_at: Option<i64>,
    /// Whether a run is in flight right now.
    pub is_running: bool,
}

/// The engine's public surface for the request layer.
pub struct SyncService {
    config: EngineConfig,
    orchestrator: Arc<SyncOrchestrator>,
    persist: Arc<dyn PersistenceGateway>,
    quota: Arc<SharedQuota>,
    cache: Arc<ResponseCache>,
    tokens: Arc<TokenManager>,
}

impl SyncService {
    /// Wire a service from configuration and the external collaborators.
    pub fn new(
        config: EngineConfig,
        remote: Arc<dyn RemoteGateway>,
        persist: Arc<dyn PersistenceGateway>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let quota = Arc::new(SharedQuota::new(config.quota.daily_limit));
        let cache = Arc::new(ResponseCache::new());
        let tokens = Arc::new(TokenManager::new(
            auth,
            Duration::from_secs(config.token.refresh_buffer_secs),
        ));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            config.clone(),
            remote,
            Arc::clone(&persist),
            Arc::clone(&tokens),
            Arc::clone(&quota),
            Arc::clone(&cache),
        ));

        Self {
            config,
            orchestrator,
            persist,
            quota,
            cache,
            tokens,
        }
    }

    /// The token manager, for login and credential seeding.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// The response cache, for stats and manual purging.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Run one sync now.
    ///
    /// Returns the resulting history record (failure detail included) for
    /// expected failure classes; errors are reserved for a run already in
    /// flight and for infrastructure failures.
    pub async fn trigger_sync(&self, id: &PlaylistId) -> Result<SyncHistoryRecord, SyncError> {
        self.orchestrator.sync_playlist(id).await
    }

    /// Current sync state of a playlist.
    pub async fn status(&self, id: &PlaylistId) -> Result<PlaylistStatus, SyncError> {
        let playlist = self
            .persist
            .load_playlist(id)
            .await
            .map_err(persist_error)?
            .ok_or_else(|| SyncError::NotFound(format!("playlist {id}")))?;

        Ok(PlaylistStatus {
            status: playlist.status,
            last_synced_at: playlist.last_synced_at,
            is_running: self.orchestrator.is_running(id),
        })
    }

    /// Quota consumption for the current UTC day.
    pub fn quota_usage(&self) -> QuotaUsage {
        self.quota.usage()
    }

    /// Recent run records for a playlist, newest first.
    pub async fn history(
        &self,
        id: &PlaylistId,
        limit: usize,
    ) -> Result<Vec<SyncHistoryRecord>, SyncError> {
        self.persist
            .load_history(id, limit)
            .await
            .map_err(persist_error)
    }

    /// Create a recurring schedule for a playlist.
    ///
    /// At most one schedule per playlist; the first run comes due one
    /// interval from now.
    pub async fn create_schedule(
        &self,
        id: &PlaylistId,
        interval_secs: u64,
        max_retries: u32,
    ) -> Result<ScheduleEntry, SyncError> {
        validate_interval(interval_secs)?;
        if self
            .persist
            .load_schedule(id)
            .await
            .map_err(persist_error)?
            .is_some()
        {
            return Err(SyncError::InvalidSchedule(format!(
                "playlist {id} already has a schedule"
            )));
        }

        let entry = ScheduleEntry {
            playlist_id: id.clone(),
            interval_secs,
            enabled: true,
            last_run_at: None,
            next_run_at: now_unix() + interval_secs as i64,
            retry_count: 0,
            max_retries,
        };
        self.persist
            .save_schedule(&entry)
            .await
            .map_err(persist_error)?;
        tracing::info!(playlist = %id, interval_secs, "schedule created");
        Ok(entry)
    }

    /// Update a schedule's interval, enabled flag, and retry budget.
    ///
    /// Run bookkeeping (`last_run_at`, `retry_count`) is preserved; the
    /// next run is re-anchored one new interval from now.
    pub async fn update_schedule(
        &self,
        id: &PlaylistId,
        interval_secs: u64,
        enabled: bool,
        max_retries: u32,
    ) -> Result<ScheduleEntry, SyncError> {
        validate_interval(interval_secs)?;
        let existing = self
            .persist
            .load_schedule(id)
            .await
            .map_err(persist_error)?
            .ok_or_else(|| SyncError::NotFound(format!("schedule for playlist {id}")))?;

        let entry = ScheduleEntry {
            interval_secs,
            enabled,
            max_retries,
            next_run_at: now_unix() + interval_secs as i64,
            ..existing
        };
        self.persist
            .save_schedule(&entry)
            .await
            .map_err(persist_error)?;
        tracing::info!(playlist = %id, interval_secs, enabled, "schedule updated");
        Ok(entry)
    }

    /// The schedule for one playlist, if any.
    pub async fn get_schedule(&self, id: &PlaylistId) -> Result<Option<ScheduleEntry>, SyncError> {
        self.persist.load_schedule(id).await.map_err(persist_error)
    }

    /// Every schedule entry.
    pub async fn list_schedules(&self) -> Result<Vec<ScheduleEntry>, SyncError> {
        self.persist.load_schedules().await.map_err(persist_error)
    }

    /// Delete the schedule for a playlist, if any.
    pub async fn delete_schedule(&self, id: &PlaylistId) -> Result<(), SyncError> {
        self.persist
            .delete_schedule(id)
            .await
            .map_err(persist_error)?;
        tracing::info!(playlist = %id, "schedule deleted");
        Ok(())
    }

    /// Spawn the recurring-schedule task.
    pub fn start_scheduler(&self) -> tokio::task::JoinHandle<()> {
        spawn_scheduler(
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.persist),
            self.config.scheduler.clone(),
        )
    }

    /// Spawn the cache expiry sweep task.
    pub fn start_cache_purge(&self) -> tokio::task::JoinHandle<()> {
        spawn_cache_purge_task(Arc::clone(&self.cache), self.config.cache.clone())
    }
}

fn persist_error(err: PersistError) -> SyncError {
    SyncError::Persistence(err.to_string())
}
