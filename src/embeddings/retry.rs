//! Bounded exponential backoff expressed as a small state machine
//!
//! The transition function is pure so the policy can be tested without a
//! network call or a clock; [`RetryPolicy::run`] is the only part that sleeps.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::RetryConfig;
use crate::errors::PulseRagError;
use crate::errors::Result;

/// Where a retried call stands after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to make attempt number `attempt` (1-based)
    Attempting { attempt: u32 },
    /// Attempt `attempt` failed; wait `delay` before the next one
    Backoff { attempt: u32, delay: Duration },
    /// No further attempts will be made
    Exhausted { attempts: u32 },
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// Delay after failed attempt `attempt`: `base * 2^(attempt-1)`, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Transition taken when attempt `attempt` fails with `error`
    pub fn on_failure(&self, attempt: u32, error: &PulseRagError) -> RetryState {
        if !error.is_retryable() || attempt >= self.max_attempts {
            return RetryState::Exhausted { attempts: attempt };
        }
        RetryState::Backoff {
            attempt,
            delay: self.delay_for(attempt),
        }
    }

    /// Transition taken once attempt `attempt` has completed
    pub fn after_attempt(&self, attempt: u32, error: Option<&PulseRagError>) -> RetryState {
        error.map_or(RetryState::Succeeded, |e| self.on_failure(attempt, e))
    }

    /// Upper bound on time spent sleeping across all attempts
    pub fn max_total_wait(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_for(a)).sum()
    }

    /// Drive `operation` through the state machine.
    ///
    /// Non-retryable failures come back unchanged. Transient failures that
    /// hit the attempt ceiling come back as
    /// [`PulseRagError::RetriesExhausted`].
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;

        loop {
            trace!("{}: {:?}", what, RetryState::Attempting { attempt });
            let outcome = operation().await;
            let state = self.after_attempt(attempt, outcome.as_ref().err());

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", what, attempt);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            match state {
                RetryState::Backoff { delay, .. } => {
                    warn!(
                        "{} attempt {}/{} failed, retrying in {:?}: {}",
                        what, attempt, self.max_attempts, delay, error
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                RetryState::Exhausted { attempts } if error.is_retryable() => {
                    warn!("{} failed after {} attempts: {}", what, attempts, error);
                    return Err(PulseRagError::RetriesExhausted {
                        attempts,
                        last_error: Box::new(error),
                    });
                }
                _ => {
                    debug!("{} failed with non-retryable error: {}", what, error);
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(200), Duration::from_millis(8000));
    }

    #[test]
    fn test_max_total_wait() {
        // Three attempts sleep twice: 1s + 2s
        assert_eq!(RetryPolicy::default().max_total_wait(), Duration::from_secs(3));
    }

    #[test]
    fn test_transient_failure_backs_off() {
        let policy = RetryPolicy::default();
        let error = PulseRagError::api("gemini", 503, "busy");
        assert_eq!(
            policy.on_failure(1, &error),
            RetryState::Backoff {
                attempt: 1,
                delay: Duration::from_millis(1000)
            }
        );
        assert_eq!(
            policy.on_failure(2, &error),
            RetryState::Backoff {
                attempt: 2,
                delay: Duration::from_millis(2000)
            }
        );
        assert_eq!(
            policy.on_failure(3, &error),
            RetryState::Exhausted { attempts: 3 }
        );
    }

    #[test]
    fn test_after_attempt_success() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.after_attempt(2, None), RetryState::Succeeded);
        let error = PulseRagError::Http("reset".to_string());
        assert!(matches!(
            policy.after_attempt(1, Some(&error)),
            RetryState::Backoff { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_client_failure_exhausts_immediately() {
        let policy = RetryPolicy::default();
        let error = PulseRagError::api("gemini", 400, "bad input");
        assert_eq!(
            policy.on_failure(1, &error),
            RetryState::Exhausted { attempts: 1 }
        );
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = fast_policy(3)
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, PulseRagError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = fast_policy(3)
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(PulseRagError::api("gemini", 500, "oops"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_wraps_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = fast_policy(3)
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(PulseRagError::Http("connection reset".to_string()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(PulseRagError::RetriesExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last_error, PulseRagError::Http(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = fast_policy(3)
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(PulseRagError::api("gemini", 403, "forbidden"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(PulseRagError::Api { status: 403, .. })));
    }
}
