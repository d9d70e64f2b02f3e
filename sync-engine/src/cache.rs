//! Read-through response cache for remote calls.
//!
//! Every remote-read operation is keyed by a [`Fingerprint`] - a stable
//! hash of the operation name and its ordered parameters - and cached with
//! a TTL per operation class. The cache is an optimization, never a source
//! of truth: entries can be dropped at any time without correctness loss,
//! and failed fetches are never cached.
//!
//! Concurrent `get`/`insert` on the same fingerprint are safe; payloads are
//! idempotent reads of remote truth, so the last insert simply wins.

use crate::remote::{RemoteItemsPage, RemotePlaylist};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use vidsync_types::VideoMeta;

/// Stable cache key for one remote operation invocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of an operation and its ordered parameters.
    ///
    /// Parameters are length-prefixed before hashing so `["ab", "c"]` and
    /// `["a", "bc"]` never collide.
    pub fn compute(operation: &str, params: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"vidsync-fingerprint-v1");
        hasher.update((operation.len() as u64).to_be_bytes());
        hasher.update(operation.as_bytes());
        for param in params {
            hasher.update((param.len() as u64).to_be_bytes());
            hasher.update(param.as_bytes());
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_string()[..8])
    }
}

/// Typed payload of one cached remote response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedPayload {
    /// A playlist metadata response.
    PlaylistMeta(RemotePlaylist),
    /// One page of playlist items.
    ItemsPage(RemoteItemsPage),
    /// One batch of video metadata.
    VideoBatch(Vec<VideoMeta>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: CachedPayload,
    expires_at: Instant,
}

/// Hit/miss counters for monitoring cache effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from cache.
    pub hits: u64,
    /// Lookups that fell through to the remote.
    pub misses: u64,
}

/// TTL cache over remote responses, shared across all in-flight syncs.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<Fingerprint, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a fingerprint; expired entries count as misses and are
    /// dropped eagerly.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CachedPayload> {
        let hit = self.entries.get(fingerprint).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(entry.payload.clone())
            } else {
                None
            }
        });

        match hit {
            Some(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload)
            }
            None => {
                // Drop the stale entry if one was there.
                self.entries
                    .remove_if(fingerprint, |_, entry| entry.expires_at <= Instant::now());
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a successful response under its fingerprint.
    pub fn insert(&self, fingerprint: Fingerprint, payload: CachedPayload, ttl: Duration) {
        self.entries.insert(
            fingerprint,
            CacheEntry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove all expired entries; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Number of entries currently stored (expired or not).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit/miss counters since startup.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidsync_types::{ChannelId, PlaylistId};

    fn payload(title: &str) -> CachedPayload {
        CachedPayload::PlaylistMeta(RemotePlaylist {
            id: PlaylistId::new("PL1"),
            title: title.to_string(),
            channel_id: ChannelId::new("UC1"),
            item_count: 0,
        })
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = Fingerprint::compute("playlist_meta", &["PL1"]);
        let b = Fingerprint::compute("playlist_meta", &["PL1"]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_by_operation_and_params() {
        let a = Fingerprint::compute("playlist_meta", &["PL1"]);
        let b = Fingerprint::compute("playlist_items", &["PL1"]);
        let c = Fingerprint::compute("playlist_meta", &["PL2"]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fingerprint_param_boundaries_do_not_collide() {
        let a = Fingerprint::compute("op", &["ab", "c"]);
        let b = Fingerprint::compute("op", &["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn get_within_ttl_returns_payload() {
        let cache = ResponseCache::new();
        let fp = Fingerprint::compute("playlist_meta", &["PL1"]);
        cache.insert(fp, payload("cached"), Duration::from_secs(60));

        assert_eq!(cache.get(&fp), Some(payload("cached")));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn get_after_ttl_is_a_miss() {
        let cache = ResponseCache::new();
        let fp = Fingerprint::compute("playlist_meta", &["PL1"]);
        cache.insert(fp, payload("cached"), Duration::from_millis(5));

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get(&fp), None);
        assert_eq!(cache.stats().misses, 1);
        // The stale entry was dropped on lookup.
        assert!(cache.is_empty());
    }

    #[test]
    fn last_insert_wins() {
        let cache = ResponseCache::new();
        let fp = Fingerprint::compute("playlist_meta", &["PL1"]);
        cache.insert(fp, payload("first"), Duration::from_secs(60));
        cache.insert(fp, payload("second"), Duration::from_secs(60));

        assert_eq!(cache.get(&fp), Some(payload("second")));
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let cache = ResponseCache::new();
        let fresh = Fingerprint::compute("playlist_meta", &["fresh"]);
        let stale = Fingerprint::compute("playlist_meta", &["stale"]);
        cache.insert(fresh, payload("fresh"), Duration::from_secs(60));
        cache.insert(stale, payload("stale"), Duration::from_millis(1));

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&fresh).is_some());
    }

    #[test]
    fn miss_on_absent_key() {
        let cache = ResponseCache::new();
        let fp = Fingerprint::compute("playlist_meta", &["PL1"]);
        assert_eq!(cache.get(&fp), None);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 1 });
    }
}
