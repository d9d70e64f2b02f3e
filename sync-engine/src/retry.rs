//! Classification-aware retry around remote calls.
//!
//! The executor consumes the [`ErrorClass`] tag of each failure rather than
//! matching concrete errors: transient failures back off exponentially, a
//! rejected token earns exactly one refresh-and-retry, quota and fatal
//! failures abort immediately. Quota is never touched here - the caller
//! reserves units *before* executing, so repeated transient attempts are
//! not re-charged.

use crate::auth::TokenManager;
use crate::config::RetryConfig;
use std::future::Future;
use vidsync_core::retry_delay;
use vidsync_types::{ErrorClass, SyncError};

/// Retry policy wrapper for remote operations.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
}

impl RetryExecutor {
    /// Create an executor from configuration.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// Run `operation` until it succeeds, fails fatally, or exhausts the
    /// attempt budget.
    ///
    /// The operation receives a valid access token per attempt. Backoff
    /// sleeps are the run's cancellation points: dropping the returned
    /// future between attempts abandons the call cleanly.
    pub async fn execute<T, F, Fut>(
        &self,
        tokens: &TokenManager,
        operation: F,
    ) -> Result<T, SyncError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let mut attempt = 1u32;
        let mut refreshed = false;

        loop {
            let token = tokens.access_token().await?;
            let err = match operation(token).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match err.class() {
                ErrorClass::Fatal | ErrorClass::QuotaExceeded => return Err(err),
                ErrorClass::AuthExpired => {
                    // One refresh per execute(); a second rejection means the
                    // fresh token is also bad and recovery is hopeless here.
                    if refreshed {
                        return Err(err);
                    }
                    refreshed = true;
                    tracing::debug!("remote rejected access token, forcing refresh");
                    tokens.force_refresh().await?;
                    // Retry the same attempt without consuming a backoff slot.
                }
                ErrorClass::Transient => {
                    if attempt >= self.max_attempts {
                        return Err(SyncError::RetriesExhausted {
                            attempts: attempt,
                            last: err.to_string(),
                        });
                    }
                    let delay = retry_delay(attempt);
                    tracing::debug!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
