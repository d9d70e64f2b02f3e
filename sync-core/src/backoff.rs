//! Backoff arithmetic for retries.
//!
//! Two distinct policies live here:
//! - call-level retry delays used by the retry executor (seconds-scale,
//!   exponential: 1s, 2s, 4s, 8s, 16s),
//! - schedule-level retry delays used by the scheduler after a failed run
//!   (minutes-scale, capped at the schedule's own interval).

use std::time::Duration;

/// Delay before retry attempt `attempt + 1`, where `attempt` is the 1-based
/// number of the attempt that just failed.
///
/// Attempt 1 waits 1s before attempt 2, attempt 2 waits 2s, and so on;
/// there is no delay before the first attempt.
pub fn retry_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(30);
    Duration::from_secs(1u64 << exp)
}

/// Delay before the next scheduled run after `retry_count` consecutive
/// failures, capped at the schedule's full interval.
///
/// `2^retry_count` minutes, so the first failure retries after 2 minutes,
/// the second after 4, never exceeding `interval`.
pub fn schedule_retry_delay(interval: Duration, retry_count: u32) -> Duration {
    let minutes = 1u64 << retry_count.min(30);
    interval.min(Duration::from_secs(minutes * 60))
}
