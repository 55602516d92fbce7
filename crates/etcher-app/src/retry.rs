//! Bounded retries for side-effect-free queries.
//!
//! Only read-only calls go through here. Mutating calls are issued exactly
//! once and their failures surface as [`EtcherError::Transport`].

use std::future::Future;
use std::time::Duration;

use etcher_core::effects::TransportError;
use etcher_core::{EtcherConfig, EtcherError};

/// How many times a query is re-issued and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
}

impl QueryRetryPolicy {
    /// Policy from configuration.
    pub fn from_config(config: &EtcherConfig) -> Self {
        Self {
            retries: config.query_retries,
            backoff: config.query_retry_backoff(),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Run `call` until it succeeds or the retry budget is spent.
    ///
    /// Exhaustion yields [`EtcherError::RemoteUnavailable`] carrying the last
    /// transport error.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, EtcherError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let attempts = self.retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < attempts => {
                    tracing::warn!(operation, attempt, %error, "Query failed, retrying");
                    attempt += 1;
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(error) => {
                    tracing::warn!(operation, attempts, %error, "Query retries exhausted");
                    return Err(EtcherError::RemoteUnavailable {
                        operation,
                        attempts,
                        last_error: error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(retries: u32) -> QueryRetryPolicy {
        QueryRetryPolicy {
            retries,
            backoff: Duration::from_millis(50),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_budget() {
        let calls = AtomicU32::new(0);
        let value = policy(2)
            .run("balance", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TransportError::unreachable("flaky"))
                } else {
                    Ok(7u64)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u64, _> = policy(1)
            .run("balance", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::unreachable(format!("attempt {n}")))
            })
            .await;
        assert_eq!(
            result,
            Err(EtcherError::RemoteUnavailable {
                operation: "balance",
                attempts: 2,
                last_error: TransportError::unreachable("attempt 1"),
            })
        );
    }

    #[tokio::test]
    async fn test_none_is_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = QueryRetryPolicy::none()
            .run("addresses", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::unreachable("down"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
