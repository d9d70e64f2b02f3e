//! Pure schedule transitions.
//!
//! The scheduler's tick loop lives in `sync-engine`; the decisions it makes
//! per entry are pure functions here, taking the entry and `now` and
//! returning the updated entry. A schedule is never left permanently stuck:
//! even at the retry budget, `next_run_at` advances by the full interval.

use crate::backoff::schedule_retry_delay;
use std::time::Duration;
use vidsync_types::{ScheduleEntry, SyncError};

/// Minimum allowed schedule interval.
pub const MIN_INTERVAL_SECS: u64 = 60;

/// Delay before re-checking a playlist whose run lock was held.
const SKIP_RETRY_SECS: i64 = 60;

/// Validate a schedule interval before it reaches the engine.
pub fn validate_interval(interval_secs: u64) -> Result<(), SyncError> {
    if interval_secs < MIN_INTERVAL_SECS {
        return Err(SyncError::InvalidSchedule(format!(
            "interval must be at least {MIN_INTERVAL_SECS}s, got {interval_secs}s"
        )));
    }
    Ok(())
}

/// Whether this entry should run at `now`.
pub fn is_due(entry: &ScheduleEntry, now: i64) -> bool {
    entry.enabled && entry.next_run_at <= now
}

/// Transition after a successful run: reset the failure streak and schedule
/// the next run a full interval out.
pub fn on_success(entry: &ScheduleEntry, now: i64) -> ScheduleEntry {
    ScheduleEntry {
        last_run_at: Some(now),
        next_run_at: now + entry.interval_secs as i64,
        retry_count: 0,
        ..entry.clone()
    }
}

/// Transition after a failed run.
///
/// Within the retry budget the next attempt comes early
/// (`min(interval, 2^retry_count minutes)`); once the budget is exhausted
/// the entry falls back to its full interval, leaving the failure visible
/// through the run history.
pub fn on_failure(entry: &ScheduleEntry, now: i64) -> ScheduleEntry {
    let retry_count = entry.retry_count.saturating_add(1);
    let interval = Duration::from_secs(entry.interval_secs);
    let delay = if retry_count < entry.max_retries {
        schedule_retry_delay(interval, retry_count)
    } else {
        interval
    };
    ScheduleEntry {
        last_run_at: Some(now),
        next_run_at: now + delay.as_secs() as i64,
        retry_count,
        ..entry.clone()
    }
}

/// Transition after the run lock rejected a scheduled trigger.
///
/// Not a failure of the playlist: the retry streak is untouched and the
/// entry is re-checked shortly.
pub fn on_skipped(entry: &ScheduleEntry, now: i64) -> ScheduleEntry {
    ScheduleEntry {
        next_run_at: now + SKIP_RETRY_SECS,
        ..entry.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidsync_types::PlaylistId;

    const NOW: i64 = 1_700_000_000;

    fn entry(interval_secs: u64, retry_count: u32) -> ScheduleEntry {
        ScheduleEntry {
            playlist_id: PlaylistId::new("PL1"),
            interval_secs,
            enabled: true,
            last_run_at: None,
            next_run_at: NOW,
            retry_count,
            max_retries: 3,
        }
    }

    #[test]
    fn interval_below_one_minute_is_rejected() {
        assert!(validate_interval(59).is_err());
        assert!(validate_interval(0).is_err());
        assert!(validate_interval(60).is_ok());
        assert!(validate_interval(3600).is_ok());
    }

    #[test]
    fn due_when_enabled_and_past_next_run() {
        let e = entry(3600, 0);
        assert!(is_due(&e, NOW));
        assert!(is_due(&e, NOW + 10));
        assert!(!is_due(&e, NOW - 1));
    }

    #[test]
    fn disabled_entries_are_never_due() {
        let mut e = entry(3600, 0);
        e.enabled = false;
        assert!(!is_due(&e, NOW + 10_000));
    }

    #[test]
    fn success_resets_retries_and_advances_full_interval() {
        let e = entry(3600, 2);
        let next = on_success(&e, NOW);
        assert_eq!(next.retry_count, 0);
        assert_eq!(next.last_run_at, Some(NOW));
        assert_eq!(next.next_run_at, NOW + 3600);
    }

    #[test]
    fn failure_schedules_short_retry_within_budget() {
        let e = entry(3600, 0);
        let next = on_failure(&e, NOW);
        assert_eq!(next.retry_count, 1);
        // 2^1 minutes = 120s, well under the hour interval.
        assert_eq!(next.next_run_at, NOW + 120);

        let next2 = on_failure(&next, NOW + 120);
        assert_eq!(next2.retry_count, 2);
        assert_eq!(next2.next_run_at, NOW + 120 + 240);
    }

    #[test]
    fn short_retry_never_exceeds_interval() {
        let e = entry(120, 1);
        let next = on_failure(&e, NOW);
        // 2^2 minutes = 240s would exceed the 120s interval.
        assert_eq!(next.next_run_at, NOW + 120);
    }

    #[test]
    fn exhausted_budget_falls_back_to_full_interval() {
        let e = entry(3600, 2); // max_retries = 3, this failure reaches it
        let next = on_failure(&e, NOW);
        assert_eq!(next.retry_count, 3);
        assert_eq!(next.next_run_at, NOW + 3600);

        // Still never stuck past the budget.
        let next2 = on_failure(&next, NOW + 3600);
        assert_eq!(next2.retry_count, 4);
        assert_eq!(next2.next_run_at, NOW + 3600 + 3600);
    }

    #[test]
    fn skipped_run_keeps_retry_streak() {
        let e = entry(3600, 2);
        let next = on_skipped(&e, NOW);
        assert_eq!(next.retry_count, 2);
        assert_eq!(next.last_run_at, None);
        assert_eq!(next.next_run_at, NOW + 60);
    }
}
