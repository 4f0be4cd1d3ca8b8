//! Standard retry/backoff policy and operational hook contracts.

use std::future::Future;
use std::time::Duration;

use ccommon::SessionId;

use crate::WireError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Single-attempt policy; side-channel calls use this unless a caller
    /// opts in to retries.
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn should_retry(&self, attempt: u32, error: &WireError) -> bool {
        error.retryable && attempt < self.max_attempts
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = (attempt.saturating_sub(1)) as i32;
        let unbounded = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(unbounded.min(self.max_backoff.as_secs_f64()))
    }
}

/// Operational observation points for transports and decoders.
///
/// Implementations must be cheap and non-blocking; they run inline with the
/// read loop.
pub trait WireHooks: Send + Sync {
    fn on_stream_started(&self, _session_id: &SessionId) {}

    fn on_record_discarded(&self, _raw: &str, _error: &str) {}

    fn on_retry_scheduled(&self, _operation: &str, _attempt: u32, _delay: Duration, _error: &WireError) {
    }

    fn on_stream_finished(&self, _session_id: &SessionId, _aborted: bool) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWireHooks;

impl WireHooks for NoopWireHooks {}

pub async fn execute_with_retry<T, Op, OpFuture, Sleep, SleepFuture>(
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn WireHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<T, WireError>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, WireError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        match execute(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if policy.should_retry(attempt, &error) {
                    let delay = policy.backoff_for_attempt(attempt);
                    hooks.on_retry_scheduled(operation, attempt, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::WireErrorKind;

    #[test]
    fn retry_policy_uses_retryable_flag_and_attempt_limit() {
        let policy = RetryPolicy::new(3);
        let retryable = WireError::timeout("timed out");
        let non_retryable = WireError::invalid_request("bad request");

        assert!(policy.should_retry(1, &retryable));
        assert!(policy.should_retry(2, &retryable));
        assert!(!policy.should_retry(3, &retryable));
        assert!(!policy.should_retry(1, &non_retryable));
    }

    #[test]
    fn retry_policy_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(250),
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(250));
        assert_eq!(policy.backoff_for_attempt(4), Duration::from_millis(250));
    }

    #[derive(Default)]
    struct RecordingHooks {
        retries: Mutex<Vec<String>>,
    }

    impl WireHooks for RecordingHooks {
        fn on_retry_scheduled(
            &self,
            operation: &str,
            attempt: u32,
            _delay: Duration,
            error: &WireError,
        ) {
            self.retries
                .lock()
                .expect("retries lock")
                .push(format!("{operation}:{attempt}:{:?}", error.kind));
        }
    }

    #[tokio::test]
    async fn execute_with_retry_retries_until_success() {
        let policy = RetryPolicy::new(3);
        let hooks = RecordingHooks::default();
        let attempts = Arc::new(Mutex::new(0_u32));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result = execute_with_retry(
            "fetch_history",
            &policy,
            &hooks,
            {
                let attempts = Arc::clone(&attempts);
                move |attempt| {
                    let attempts = Arc::clone(&attempts);
                    async move {
                        *attempts.lock().expect("attempts lock") = attempt;
                        if attempt < 3 {
                            Err(WireError::transport("temporary"))
                        } else {
                            Ok("ok")
                        }
                    }
                }
            },
            {
                let sleeps = Arc::clone(&sleeps);
                move |delay| {
                    let sleeps = Arc::clone(&sleeps);
                    async move {
                        sleeps.lock().expect("sleep lock").push(delay);
                    }
                }
            },
        )
        .await;

        assert_eq!(result.expect("result should succeed"), "ok");
        assert_eq!(*attempts.lock().expect("attempts lock"), 3);
        assert_eq!(sleeps.lock().expect("sleep lock").len(), 2);
        assert_eq!(hooks.retries.lock().expect("retries lock").len(), 2);
    }

    #[tokio::test]
    async fn execute_with_retry_stops_on_non_retryable_error() {
        let policy = RetryPolicy::new(5);
        let hooks = RecordingHooks::default();

        let result = execute_with_retry::<(), _, _, _, _>(
            "fetch_history",
            &policy,
            &hooks,
            |_| async move { Err(WireError::invalid_request("bad input")) },
            |_| async move {},
        )
        .await;

        let error = result.expect_err("result should fail");
        assert_eq!(error.kind, WireErrorKind::InvalidRequest);
        assert!(hooks.retries.lock().expect("retries lock").is_empty());
    }
}
