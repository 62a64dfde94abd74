//! services/api/src/adapters/retry.rs
//!
//! Bounded retry with exponential backoff for transport calls. Only network-level
//! failures are retried; an answer from the server, even a rejection, is final.
//! Callers that must not repeat a request the server may have seen narrow the
//! retry condition with `with_retry_when`.

use access_core::{PortError, PortResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the policy
/// runs out of retries.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, op: F) -> PortResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortResult<T>>,
{
    with_retry_when(policy, what, PortError::is_retryable, op).await
}

/// Like `with_retry`, but only errors accepted by `should_retry` are retried.
pub async fn with_retry_when<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    should_retry: fn(&PortError) -> bool,
    mut op: F,
) -> PortResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if should_retry(&e) && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed ({}), retrying in {:?} ({}/{}).",
                    what,
                    e,
                    delay,
                    attempt + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Maps a `reqwest` failure onto the port error taxonomy.
pub fn port_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout
    } else if e.is_connect() {
        PortError::Connect(e.to_string())
    } else if e.is_request() || e.is_body() {
        PortError::Transport(e.to_string())
    } else {
        PortError::Unexpected(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy::new(5);
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for(10), Duration::from_secs(4));
        assert_eq!(policy.delay_for(40), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&quick(3), "charge", move || async move {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(PortError::Timeout),
                _ => Ok("done"),
            }
        })
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_retry_budget() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: PortResult<()> = with_retry(&quick(2), "login", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PortError::Transport("refused".into()))
        })
        .await;
        assert_eq!(result, Err(PortError::Transport("refused".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn narrowed_retry_stops_once_the_request_may_have_landed() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: PortResult<()> = with_retry_when(
            &quick(5),
            "charge",
            PortError::is_undelivered,
            move || async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(PortError::Connect("refused".into())),
                    _ => Err(PortError::Timeout),
                }
            },
        )
        .await;
        assert_eq!(result, Err(PortError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_return_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: PortResult<()> = with_retry(&quick(5), "verify", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PortError::Unexpected("bad payload".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
