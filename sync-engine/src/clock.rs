//! Wall-clock access for the engine.
//!
//! Everything in `sync-core` takes `now` explicitly; this is the single
//! place the engine reads the system clock to feed it.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix timestamp in seconds.
pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}
