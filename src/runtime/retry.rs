// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry bounds and backoff.
//!
//! Two loops in the client retry with doubling backoff:
//!
//! - the request executor, which logs in again when the controller reports
//!   an expired session ([`SessionRetry`]),
//! - `get_api`, which resends a read when the HTTP round trip itself failed
//!   ([`TransportRetry`]).
//!
//! Nothing else is retried. A controller that answers `return: false` has
//! answered, and the caller's check decides what that means.
//!
//! # Example
//!
//! ```
//! use aviatrix_api_rs::runtime::{BackoffStrategy, SessionRetry};
//! use std::time::Duration;
//!
//! let retry = SessionRetry::new(3, Duration::from_millis(250));
//! let backoff = retry.backoff();
//! assert_eq!(backoff.delay(0), Duration::from_millis(250));
//! assert_eq!(backoff.delay(1), Duration::from_millis(500));
//! ```

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ControllerError;

/// Delay before a retry.
pub trait BackoffStrategy: Clone + Send + Sync + 'static {
    /// Delay before retry number `retry` (0-indexed).
    fn delay(&self, retry: u32) -> Duration;
}

/// Delay that doubles with every retry, up to a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: Duration::MAX,
        }
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.max_delay)
    }
}

/// Bounds for the re-authentication loop of the request executor.
///
/// An attempt that comes back with an expired session triggers a login, then
/// the request is resent after `initial_backoff`, doubling each time, until
/// `max_attempts` requests have been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRetry {
    /// Total number of requests per logical call, including the first.
    pub max_attempts: u32,
    /// Sleep before the second request.
    pub initial_backoff: Duration,
}

impl Default for SessionRetry {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl SessionRetry {
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.initial_backoff)
    }
}

/// Resend bounds for reads whose HTTP round trip failed.
///
/// Only [`ControllerError::Transport`] is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportRetry {
    /// Total number of tries, including the first.
    pub max_tries: u32,
    pub initial_backoff: Duration,
}

impl Default for TransportRetry {
    fn default() -> Self {
        Self {
            max_tries: 5,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl TransportRetry {
    #[must_use]
    pub fn new(max_tries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            initial_backoff,
        }
    }

    /// A single try.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(1, Duration::ZERO)
    }

    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.initial_backoff)
    }

    /// Run `operation` until it succeeds, fails with something other than a
    /// transport error, or runs out of tries.
    ///
    /// Cancelling `cancel` interrupts a pending backoff sleep.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, ControllerError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ControllerError>>,
    {
        let backoff = self.backoff();
        let mut tried = 0;

        loop {
            let err = match operation(tried).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            tried += 1;
            if !matches!(err, ControllerError::Transport { .. }) || tried >= self.max_tries {
                return Err(err);
            }

            let delay = backoff.delay(tried - 1);
            tracing::warn!(
                target: "aviatrix_api::http",
                attempt = tried,
                ?delay,
                err = %err,
                "HTTP request failed, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(ControllerError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_exponential_backoff_doubles() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100));
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_exponential_backoff_cap() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500));
        assert_eq!(backoff.delay(5), Duration::from_millis(500));
        assert_eq!(backoff.delay(64), Duration::from_millis(500));
    }

    #[test]
    fn test_session_retry_defaults() {
        let retry = SessionRetry::default();
        assert_eq!(retry.max_attempts, 2);

        let backoff = retry.backoff();
        assert_eq!(backoff.delay(0), Duration::from_millis(500));
        assert_eq!(backoff.delay(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_at_least_one_try() {
        assert_eq!(SessionRetry::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(TransportRetry::new(0, Duration::ZERO).max_tries, 1);
        assert_eq!(TransportRetry::disabled().max_tries, 1);
    }

    #[test]
    fn test_transport_retry_defaults() {
        let retry = TransportRetry::default();
        assert_eq!(retry.max_tries, 5);
        assert_eq!(retry.backoff().delay(0), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let cancel = CancellationToken::new();
        let result = TransportRetry::default()
            .execute(&cancel, |_| async { Ok(42) })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_execute_does_not_retry_controller_errors() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<i32, ControllerError> = TransportRetry::new(3, Duration::ZERO)
            .execute(&cancel, |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ControllerError::Api("bad input".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(ControllerError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_retries_transport_errors() {
        let cancel = CancellationToken::new();
        let http = reqwest::Client::new();
        let calls = Arc::new(AtomicU32::new(0));

        // Nothing listens on port 1.
        let result: Result<(), ControllerError> = TransportRetry::new(3, Duration::from_millis(1))
            .execute(&cancel, |_| {
                let calls = calls.clone();
                let http = http.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    http.get("http://127.0.0.1:1/")
                        .send()
                        .await
                        .map(|_| ())
                        .map_err(|e| ControllerError::transport("GET list_accounts", e))
                }
            })
            .await;

        assert!(matches!(result, Err(ControllerError::Transport { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_cancelled_during_backoff() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let http = reqwest::Client::new();

        let result: Result<(), ControllerError> = TransportRetry::new(3, Duration::from_secs(60))
            .execute(&cancel, |_| {
                let http = http.clone();
                async move {
                    http.get("http://127.0.0.1:1/")
                        .send()
                        .await
                        .map(|_| ())
                        .map_err(|e| ControllerError::transport("GET list_accounts", e))
                }
            })
            .await;

        assert!(matches!(result, Err(ControllerError::Cancelled)));
    }
}
