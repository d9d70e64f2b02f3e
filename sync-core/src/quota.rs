//! Day-bucketed quota accounting.
//!
//! The remote platform prices every call in quota units against a daily
//! budget. [`QuotaLedger`] tracks consumption per UTC day and gates
//! reservations: a reservation that would exceed the budget is denied
//! without mutating the ledger, so callers can fail fast before issuing
//! the remote call.
//!
//! The ledger is pure - callers pass `now` explicitly - and single-threaded;
//! `sync-engine` wraps it in a mutex so concurrent syncs reserve atomically.

use std::collections::BTreeMap;
use vidsync_types::QuotaUsage;

const SECS_PER_DAY: i64 = 86_400;

/// Outcome of a quota reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The cost was charged to today's bucket.
    Allowed,
    /// Charging the cost would exceed the daily limit; nothing was charged.
    Denied {
        /// Units still available in today's bucket.
        remaining: u64,
    },
}

/// Consumed quota units per UTC day, against a configured daily limit.
///
/// Buckets are created lazily on the first reservation of a day and are
/// retained after rollover for historical reporting; only the current day's
/// bucket is ever consulted for an allow/deny decision.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    daily_limit: u64,
    buckets: BTreeMap<i64, u64>,
}

impl QuotaLedger {
    /// Create a ledger with the given daily limit in quota units.
    pub fn new(daily_limit: u64) -> Self {
        Self {
            daily_limit,
            buckets: BTreeMap::new(),
        }
    }

    /// Try to charge `cost` units against the UTC-day bucket containing
    /// `now` (unix seconds).
    ///
    /// Denials leave the ledger untouched: there is no partial charge.
    pub fn reserve_at(&mut self, cost: u64, now: i64) -> Reservation {
        let used = self.buckets.entry(day_key(now)).or_insert(0);
        if used.saturating_add(cost) > self.daily_limit {
            return Reservation::Denied {
                remaining: self.daily_limit - *used,
            };
        }
        *used += cost;
        Reservation::Allowed
    }

    /// Usage snapshot for the UTC day containing `now`.
    pub fn usage_at(&self, now: i64) -> QuotaUsage {
        let used = self.buckets.get(&day_key(now)).copied().unwrap_or(0);
        QuotaUsage {
            used,
            limit: self.daily_limit,
            remaining: self.daily_limit - used,
            reset_at: next_utc_midnight(now),
        }
    }

    /// Units used on the UTC day containing `at`, for historical reporting.
    ///
    /// Returns 0 for days with no recorded consumption.
    pub fn used_on(&self, at: i64) -> u64 {
        self.buckets.get(&day_key(at)).copied().unwrap_or(0)
    }

    /// Number of day buckets recorded so far.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// UTC day index (days since the epoch) for a unix timestamp.
fn day_key(now: i64) -> i64 {
    now.div_euclid(SECS_PER_DAY)
}

/// Unix timestamp of the next UTC midnight after `now`.
fn next_utc_midnight(now: i64) -> i64 {
    (day_key(now) + 1) * SECS_PER_DAY
}
