//! Mock authorization provider for testing.
//!
//! Issues sequentially numbered tokens and allows queueing failures and an
//! artificial latency so tests can overlap concurrent refresh rounds.

use super::{AuthProvider, Credentials};
use crate::clock::now_unix;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidsync_types::SyncError;

const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Mock authorization provider for testing.
///
/// Clones share state, so a test can keep a handle for scripting while the
/// token manager owns another.
#[derive(Debug, Default)]
pub struct MockAuthProvider {
    inner: Arc<Mutex<MockAuthInner>>,
}

#[derive(Debug, Default)]
struct MockAuthInner {
    exchange_calls: u32,
    refresh_calls: u32,
    issued: u32,
    fail_next_refresh: VecDeque<SyncError>,
    delay: Option<Duration>,
}

impl MockAuthProvider {
    /// Create a mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error for an upcoming `refresh` call.
    pub fn fail_next_refresh(&self, err: SyncError) {
        self.inner.lock().unwrap().fail_next_refresh.push_back(err);
    }

    /// Delay every provider call by `duration`.
    pub fn set_delay(&self, duration: Duration) {
        self.inner.lock().unwrap().delay = Some(duration);
    }

    /// Number of `refresh` calls so far.
    pub fn refresh_calls(&self) -> u32 {
        self.inner.lock().unwrap().refresh_calls
    }

    /// Number of `exchange_code` calls so far.
    pub fn exchange_calls(&self) -> u32 {
        self.inner.lock().unwrap().exchange_calls
    }

    fn delay_duration(&self) -> Option<Duration> {
        self.inner.lock().unwrap().delay
    }

    async fn apply_delay(&self) {
        if let Some(delay) = self.delay_duration() {
            tokio::time::sleep(delay).await;
        }
    }

    fn issue(inner: &mut MockAuthInner) -> Credentials {
        inner.issued += 1;
        Credentials {
            access_token: format!("token-{}", inner.issued),
            refresh_token: format!("refresh-{}", inner.issued),
            expires_at: now_unix() + TOKEN_LIFETIME_SECS,
        }
    }
}

impl Clone for MockAuthProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn exchange_code(&self, _code: &str) -> Result<Credentials, SyncError> {
        self.apply_delay().await;
        let mut inner = self.inner.lock().unwrap();
        inner.exchange_calls += 1;
        Ok(Self::issue(&mut inner))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Credentials, SyncError> {
        self.apply_delay().await;
        let mut inner = self.inner.lock().unwrap();
        inner.refresh_calls += 1;

        if let Some(err) = inner.fail_next_refresh.pop_front() {
            return Err(err);
        }
        Ok(Self::issue(&mut inner))
    }
}
