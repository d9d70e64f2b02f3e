//! Shared quota gate for concurrent syncs.
//!
//! Wraps the pure [`QuotaLedger`] from `sync-core` behind a mutex so any
//! number of in-flight orchestrator runs reserve atomically: the check and
//! the charge happen under one lock, never as read-then-write.

use crate::clock::now_unix;
use std::sync::Mutex;
use vidsync_core::{QuotaLedger, Reservation};
use vidsync_types::{QuotaUsage, SyncError};

/// Thread-safe quota ledger shared by all orchestrator runs.
#[derive(Debug)]
pub struct SharedQuota {
    ledger: Mutex<QuotaLedger>,
}

impl SharedQuota {
    /// Create a shared ledger with the given daily limit.
    pub fn new(daily_limit: u64) -> Self {
        Self {
            ledger: Mutex::new(QuotaLedger::new(daily_limit)),
        }
    }

    /// Reserve `cost` units against today's bucket, or fail fast.
    ///
    /// A denial mutates nothing; the caller must skip the remote call
    /// entirely.
    pub fn reserve(&self, cost: u64) -> Result<(), SyncError> {
        self.reserve_at(cost, now_unix())
    }

    /// Reserve against the bucket containing an explicit timestamp.
    pub fn reserve_at(&self, cost: u64, now: i64) -> Result<(), SyncError> {
        let mut ledger = self.ledger.lock().expect("quota ledger poisoned");
        match ledger.reserve_at(cost, now) {
            Reservation::Allowed => Ok(()),
            Reservation::Denied { remaining } => Err(SyncError::QuotaExceeded {
                remaining,
                reset_at: ledger.usage_at(now).reset_at,
            }),
        }
    }

    /// Usage snapshot for the current UTC day.
    pub fn usage(&self) -> QuotaUsage {
        self.usage_at(now_unix())
    }

    /// Usage snapshot for the UTC day containing an explicit timestamp.
    pub fn usage_at(&self, now: i64) -> QuotaUsage {
        self.ledger
            .lock()
            .expect("quota ledger poisoned")
            .usage_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn reserve_and_usage_agree() {
        let quota = SharedQuota::new(100);
        quota.reserve_at(40, NOW).unwrap();
        let usage = quota.usage_at(NOW);
        assert_eq!(usage.used, 40);
        assert_eq!(usage.remaining, 60);
    }

    #[test]
    fn denial_maps_to_quota_exceeded_with_reset_time() {
        let quota = SharedQuota::new(10);
        quota.reserve_at(10, NOW).unwrap();

        let err = quota.reserve_at(1, NOW).unwrap_err();
        match err {
            SyncError::QuotaExceeded {
                remaining,
                reset_at,
            } => {
                assert_eq!(remaining, 0);
                assert!(reset_at > NOW);
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_reservations_never_overshoot() {
        let quota = Arc::new(SharedQuota::new(100));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let quota = Arc::clone(&quota);
            handles.push(std::thread::spawn(move || {
                let mut granted = 0u64;
                for _ in 0..50 {
                    if quota.reserve_at(1, NOW).is_ok() {
                        granted += 1;
                    }
                }
                granted
            }));
        }

        let granted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 100);
        assert_eq!(quota.usage_at(NOW).used, 100);
    }
}
