//! Authorization: provider abstraction and single-flight token refresh.
//!
//! The platform issues short-lived access tokens alongside a long-lived
//! refresh token. [`TokenManager`] owns the current credential pair and
//! guarantees that concurrent callers observing a stale token share one
//! in-flight refresh instead of stampeding the authorization endpoint.
//! A refresh storm would burn rate limits and can invalidate tokens that
//! other callers are still using, so this is the one concurrency property
//! the rest of the engine leans on.

mod mock;

pub use mock::MockAuthProvider;

use crate::clock::now_unix;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use vidsync_types::SyncError;

/// An access/refresh credential pair with its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token presented on remote calls.
    pub access_token: String,
    /// Long-lived token used to obtain fresh access tokens.
    pub refresh_token: String,
    /// Unix timestamp at which the access token expires.
    pub expires_at: i64,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Client for the platform's authorization endpoint.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange an OAuth authorization code for an initial credential pair.
    async fn exchange_code(&self, code: &str) -> Result<Credentials, SyncError>;

    /// Obtain a fresh credential pair from a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<Credentials, SyncError>;
}

/// Outcome of one refresh round, broadcast to every waiter of that round.
type RoundOutcome = Option<Result<(), SyncError>>;

struct TokenState {
    creds: Option<Credentials>,
    /// In-flight refresh marker; present while a refresh round is running.
    inflight: Option<watch::Receiver<RoundOutcome>>,
}

enum Plan {
    Ready(String),
    Wait(watch::Receiver<RoundOutcome>),
    Lead {
        tx: watch::Sender<RoundOutcome>,
        refresh_token: String,
    },
}

/// Holds the current credentials and refreshes them single-flight.
pub struct TokenManager {
    provider: Arc<dyn AuthProvider>,
    refresh_buffer: Duration,
    state: Mutex<TokenState>,
}

impl TokenManager {
    /// Create a manager over an authorization provider.
    ///
    /// `refresh_buffer` is subtracted from the expiry: a token inside the
    /// buffer window is treated as already stale.
    pub fn new(provider: Arc<dyn AuthProvider>, refresh_buffer: Duration) -> Self {
        Self {
            provider,
            refresh_buffer,
            state: Mutex::new(TokenState {
                creds: None,
                inflight: None,
            }),
        }
    }

    /// Seed the manager with an existing credential pair.
    pub async fn initialize(&self, credentials: Credentials) {
        let mut state = self.state.lock().await;
        state.creds = Some(credentials);
    }

    /// Exchange an authorization code and adopt the resulting credentials.
    pub async fn login(&self, code: &str) -> Result<(), SyncError> {
        let credentials = self.provider.exchange_code(code).await?;
        self.initialize(credentials).await;
        Ok(())
    }

    /// Current credentials, if initialized.
    pub async fn credentials(&self) -> Option<Credentials> {
        self.state.lock().await.creds.clone()
    }

    /// Get a valid access token, refreshing first if the stored one is
    /// expired or inside the safety buffer.
    ///
    /// Suspends until a valid token is available. Concurrent callers share
    /// one refresh round; a failed round propagates its error to every
    /// waiter, each of which may independently retry.
    pub async fn access_token(&self) -> Result<String, SyncError> {
        loop {
            let plan = self.plan().await?;
            match plan {
                Plan::Ready(token) => return Ok(token),
                Plan::Wait(rx) => wait_round(rx).await?,
                Plan::Lead { tx, refresh_token } => {
                    return self.run_refresh(tx, &refresh_token).await;
                }
            }
        }
    }

    /// Force one refresh round, joining an in-flight round if present.
    ///
    /// Used when the remote rejects a token the manager still considered
    /// valid (clock skew, server-side revocation).
    pub async fn force_refresh(&self) -> Result<(), SyncError> {
        let plan = {
            let mut state = self.state.lock().await;
            if let Some(rx) = &state.inflight {
                Plan::Wait(rx.clone())
            } else {
                let creds = state
                    .creds
                    .as_ref()
                    .ok_or_else(|| SyncError::Internal("token manager not initialized".into()))?;
                let refresh_token = creds.refresh_token.clone();
                let (tx, rx) = watch::channel(None);
                state.inflight = Some(rx);
                Plan::Lead { tx, refresh_token }
            }
        };

        match plan {
            Plan::Wait(rx) => wait_round(rx).await,
            Plan::Lead { tx, refresh_token } => {
                self.run_refresh(tx, &refresh_token).await.map(|_| ())
            }
            Plan::Ready(_) => unreachable!("force_refresh never plans Ready"),
        }
    }

    async fn plan(&self) -> Result<Plan, SyncError> {
        let mut state = self.state.lock().await;

        if let Some(creds) = &state.creds {
            if self.is_fresh(creds) {
                return Ok(Plan::Ready(creds.access_token.clone()));
            }
            if let Some(rx) = &state.inflight {
                return Ok(Plan::Wait(rx.clone()));
            }
            let refresh_token = creds.refresh_token.clone();
            let (tx, rx) = watch::channel(None);
            state.inflight = Some(rx);
            return Ok(Plan::Lead { tx, refresh_token });
        }

        if let Some(rx) = &state.inflight {
            return Ok(Plan::Wait(rx.clone()));
        }
        Err(SyncError::Internal("token manager not initialized".into()))
    }

    /// Run one refresh round as the leader and broadcast the outcome.
    ///
    /// The provider call happens without holding the state lock; the
    /// in-flight marker is cleared on both paths before waiters are woken.
    async fn run_refresh(
        &self,
        tx: watch::Sender<RoundOutcome>,
        refresh_token: &str,
    ) -> Result<String, SyncError> {
        tracing::debug!("refreshing access token");
        let outcome = self.provider.refresh(refresh_token).await;

        let mut state = self.state.lock().await;
        state.inflight = None;
        match outcome {
            Ok(creds) => {
                let token = creds.access_token.clone();
                state.creds = Some(creds);
                drop(state);
                let _ = tx.send(Some(Ok(())));
                tracing::info!("access token refreshed");
                Ok(token)
            }
            Err(err) => {
                drop(state);
                let err = match err {
                    SyncError::AuthRefreshFailed(_) => err,
                    other => SyncError::AuthRefreshFailed(other.to_string()),
                };
                let _ = tx.send(Some(Err(err.clone())));
                tracing::warn!(error = %err, "token refresh failed");
                Err(err)
            }
        }
    }

    fn is_fresh(&self, creds: &Credentials) -> bool {
        creds.expires_at - now_unix() > self.refresh_buffer.as_secs() as i64
    }
}

/// Await the outcome of a refresh round someone else is leading.
async fn wait_round(mut rx: watch::Receiver<RoundOutcome>) -> Result<(), SyncError> {
    loop {
        if let Some(outcome) = rx.borrow().clone() {
            return outcome;
        }
        if rx.changed().await.is_err() {
            return Err(SyncError::Internal("refresh round abandoned".into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;

    const BUFFER: Duration = Duration::from_secs(300);

    fn manager(provider: &MockAuthProvider) -> TokenManager {
        TokenManager::new(Arc::new(provider.clone()), BUFFER)
    }

    fn fresh_creds() -> Credentials {
        Credentials {
            access_token: "seed-token".into(),
            refresh_token: "seed-refresh".into(),
            expires_at: now_unix() + 3600,
        }
    }

    fn stale_creds() -> Credentials {
        Credentials {
            access_token: "stale-token".into(),
            refresh_token: "seed-refresh".into(),
            expires_at: now_unix() - 10,
        }
    }

    #[tokio::test]
    async fn fresh_token_returned_without_refresh() {
        let provider = MockAuthProvider::new();
        let tokens = manager(&provider);
        tokens.initialize(fresh_creds()).await;

        let token = tokens.access_token().await.unwrap();
        assert_eq!(token, "seed-token");
        assert_eq!(provider.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn expired_token_triggers_refresh() {
        let provider = MockAuthProvider::new();
        let tokens = manager(&provider);
        tokens.initialize(stale_creds()).await;

        let token = tokens.access_token().await.unwrap();
        assert_eq!(token, "token-1");
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn token_inside_buffer_window_is_stale() {
        let provider = MockAuthProvider::new();
        let tokens = manager(&provider);
        tokens
            .initialize(Credentials {
                access_token: "soon-to-expire".into(),
                refresh_token: "seed-refresh".into(),
                // Valid, but inside the 5-minute safety buffer.
                expires_at: now_unix() + 60,
            })
            .await;

        tokens.access_token().await.unwrap();
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ten_concurrent_callers_share_one_refresh() {
        let provider = MockAuthProvider::new();
        provider.set_delay(Duration::from_millis(50));
        let tokens = Arc::new(manager(&provider));
        tokens.initialize(stale_creds()).await;

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let tokens = Arc::clone(&tokens);
                tokio::spawn(async move { tokens.access_token().await })
            })
            .collect();

        let results = join_all(tasks).await;
        for result in results {
            assert_eq!(result.unwrap().unwrap(), "token-1");
        }
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_round_propagates_to_all_waiters() {
        let provider = MockAuthProvider::new();
        provider.set_delay(Duration::from_millis(50));
        provider.fail_next_refresh(SyncError::AuthRefreshFailed("grant revoked".into()));
        let tokens = Arc::new(manager(&provider));
        tokens.initialize(stale_creds()).await;

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let tokens = Arc::clone(&tokens);
                tokio::spawn(async move { tokens.access_token().await })
            })
            .collect();

        for result in join_all(tasks).await {
            let err = result.unwrap().unwrap_err();
            assert!(matches!(err, SyncError::AuthRefreshFailed(_)));
        }
        assert_eq!(provider.refresh_calls(), 1);

        // Waiters may retry independently; the next round succeeds.
        assert_eq!(tokens.access_token().await.unwrap(), "token-2");
        assert_eq!(provider.refresh_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn force_refresh_joins_inflight_round() {
        let provider = MockAuthProvider::new();
        provider.set_delay(Duration::from_millis(50));
        let tokens = Arc::new(manager(&provider));
        tokens.initialize(stale_creds()).await;

        let reader = {
            let tokens = Arc::clone(&tokens);
            tokio::spawn(async move { tokens.access_token().await })
        };
        let forcer = {
            let tokens = Arc::clone(&tokens);
            tokio::spawn(async move { tokens.force_refresh().await })
        };

        reader.await.unwrap().unwrap();
        forcer.await.unwrap().unwrap();
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn force_refresh_replaces_valid_token() {
        let provider = MockAuthProvider::new();
        let tokens = manager(&provider);
        tokens.initialize(fresh_creds()).await;

        tokens.force_refresh().await.unwrap();
        assert_eq!(tokens.access_token().await.unwrap(), "token-1");
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn uninitialized_manager_errors() {
        let provider = MockAuthProvider::new();
        let tokens = manager(&provider);
        assert!(tokens.access_token().await.is_err());
        assert!(tokens.force_refresh().await.is_err());
        assert_eq!(provider.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn login_exchanges_code_for_credentials() {
        let provider = MockAuthProvider::new();
        let tokens = manager(&provider);

        tokens.login("auth-code").await.unwrap();
        assert_eq!(provider.exchange_calls(), 1);
        assert!(tokens.credentials().await.is_some());
        // The exchanged token is fresh, no refresh needed.
        tokens.access_token().await.unwrap();
        assert_eq!(provider.refresh_calls(), 0);
    }

    #[test]
    fn credentials_debug_redacts_tokens() {
        let debug = format!("{:?}", fresh_creds());
        assert!(!debug.contains("seed-token"));
        assert!(debug.contains("REDACTED"));
    }
}
