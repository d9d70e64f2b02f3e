//! Recurring sync schedules.
//!
//! The scheduler task ticks on a fixed cadence, selects due entries, and
//! spawns one orchestrator run per due playlist. Runs for different
//! playlists proceed independently; only the orchestrator's per-playlist
//! lock prevents double-running the same one. Entry transitions (success,
//! failure backoff, lock-contention skip) are the pure functions in
//! `sync-core::schedule`.

use crate::clock::now_unix;
use crate::config::SchedulerConfig;
use crate::orchestrator::SyncOrchestrator;
use crate::persist::PersistenceGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use vidsync_core::{is_due, on_failure, on_skipped, on_success};
use vidsync_types::{ScheduleEntry, SyncError, SyncStatus};

/// Spawn the background scheduler task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_scheduler(
    orchestrator: Arc<SyncOrchestrator>,
    persist: Arc<dyn PersistenceGateway>,
    config: SchedulerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Scheduler disabled");
            return;
        }

        tracing::info!("Scheduler started (tick: {}s)", config.tick_secs);
        let mut timer = interval(Duration::from_secs(config.tick_secs));

        loop {
            timer.tick().await;

            let schedules = match persist.load_schedules().await {
                Ok(schedules) => schedules,
                Err(e) => {
                    tracing::error!("Scheduler could not load schedules: {}", e);
                    continue;
                }
            };

            let now = now_unix();
            for entry in schedules.into_iter().filter(|entry| is_due(entry, now)) {
                let orchestrator = Arc::clone(&orchestrator);
                let persist = Arc::clone(&persist);
                tokio::spawn(async move {
                    run_due_entry(orchestrator, persist, entry).await;
                });
            }
        }
    })
}

/// Run one due entry and persist its transition.
async fn run_due_entry(
    orchestrator: Arc<SyncOrchestrator>,
    persist: Arc<dyn PersistenceGateway>,
    entry: ScheduleEntry,
) {
    let id = entry.playlist_id.clone();
    tracing::debug!(playlist = %id, "scheduled sync due");

    let result = orchestrator.sync_playlist(&id).await;
    let now = now_unix();

    let updated = match result {
        Ok(record) if record.status == SyncStatus::Completed => on_success(&entry, now),
        Ok(record) => {
            tracing::warn!(
                playlist = %id,
                error = record.error.as_deref().unwrap_or(""),
                retry_count = entry.retry_count + 1,
                "scheduled sync failed"
            );
            on_failure(&entry, now)
        }
        Err(SyncError::SyncInProgress(_)) => {
            tracing::debug!(playlist = %id, "scheduled sync skipped, run already in flight");
            on_skipped(&entry, now)
        }
        Err(e) => {
            tracing::error!(playlist = %id, error = %e, "scheduled sync errored");
            on_failure(&entry, now)
        }
    };

    if let Err(e) = persist.save_schedule(&updated).await {
        tracing::error!(playlist = %id, error = %e, "could not persist schedule transition");
    }
}
