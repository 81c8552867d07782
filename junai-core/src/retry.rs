//! Retry-with-backoff wrapper applied to every collaborator call.
//!
//! The policy is decoupled from the business logic: callers hand in a closure
//! that performs one attempt, and a [`RetryPolicy`] decides how often and how
//! long to wait. Only [`NavigationError::is_retryable`] errors are retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{NavigationError, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
    /// Cap for the exponential delay.
    pub max_delay: Duration,
    /// Deadline for a single attempt.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting: the plain fail-fast behaviour.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            attempt_timeout: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay.max(base_delay);
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry number `retries_used + 1`: `base * 2^retries_used`, capped.
    pub fn backoff(&self, retries_used: u32) -> Duration {
        let base_ms = self.base_delay.as_millis();
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let max_ms = self.max_delay.as_millis().max(base_ms);
        let shift = retries_used.min(20);
        let backoff_ms = base_ms.saturating_mul(1u128 << shift).min(max_ms);
        Duration::from_millis(u64::try_from(backoff_ms).unwrap_or(u64::MAX))
    }
}

/// Per-call-site retry policies used by the navigation loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationPolicies {
    /// Context retrieval and execution storage.
    pub memory: RetryPolicy,
    /// Plan generation.
    pub planner: RetryPolicy,
    /// Agent execution.
    pub agent: RetryPolicy,
}

impl NavigationPolicies {
    /// Every call site fail-fast.
    pub fn none() -> Self {
        Self {
            memory: RetryPolicy::none(),
            planner: RetryPolicy::none(),
            agent: RetryPolicy::none(),
        }
    }
}

/// Runs `op` under `policy`.
///
/// `on_timeout` builds the error reported when an attempt exceeds
/// `policy.attempt_timeout`; it should be a retryable kind matching the call site.
pub async fn with_retry<T, F, Fut, E>(
    policy: &RetryPolicy,
    call_site: &str,
    on_timeout: E,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    E: Fn() -> NavigationError,
{
    let attempts = policy.attempts();
    let mut retries_used: u32 = 0;

    loop {
        let outcome = match policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, op()).await {
                Ok(result) => result,
                Err(_) => Err(on_timeout()),
            },
            None => op().await,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let attempt = retries_used.saturating_add(1);
        if !err.is_retryable() || attempt >= attempts {
            return Err(err);
        }

        let delay = policy.backoff(retries_used);
        warn!(
            call_site = %call_site,
            error_kind = err.kind(),
            error = %err,
            attempt = attempt,
            max_attempts = attempts,
            retry_in_ms = delay.as_millis() as u64,
            "Collaborator call failed; retrying"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        retries_used = attempt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::none().with_max_attempts(max_attempts)
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default()
            .with_backoff(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
        assert_eq!(RetryPolicy::none().backoff(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let value = with_retry(
            &fast(3),
            "store.query",
            || NavigationError::store("query", "timeout"),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(NavigationError::store("query", "connection refused"))
                } else {
                    Ok(n)
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = with_retry(
            &fast(2),
            "agent.execute",
            || NavigationError::remote("bindai", "timeout"),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(NavigationError::remote("bindai", "502"))
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "remote_call_failed");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let err = with_retry(
            &fast(5),
            "agent.execute",
            || NavigationError::remote("bindai", "timeout"),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(NavigationError::AuthenticationMissing {
                    agent: "bindai".to_string(),
                })
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "authentication_missing");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_maps_to_call_site_error() {
        let policy = fast(1).with_attempt_timeout(Some(Duration::from_millis(10)));
        let err = with_retry(
            &policy,
            "store.insert",
            || NavigationError::store("insert", "timed out"),
            || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "store unavailable during insert: timed out");
    }
}
