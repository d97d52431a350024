//! Retry policy — bounded re-execution of an async operation with
//! classification-driven backoff.
//!
//! Rate-limited failures back off at `base_delay × 2^(attempt-1)`, honoring a
//! larger server-advised `retry-after` when one is present. Server errors and
//! transient network faults back off more gently at `base_delay × 1.5^(attempt-1)`.
//! Everything else propagates after a single attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::ApiError;

/// Pluggable sleep so tests can record delays instead of waiting them out.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A bounded retry/backoff schedule. `max_attempts` counts the first
/// execution, so a budget of 1 never retries.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self::with_sleeper(max_attempts, base_delay, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(max_attempts: u32, base_delay: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            sleeper,
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or exhausts the attempt budget. The last error is propagated as-is.
    ///
    /// The operation's own side effects are not undone between attempts;
    /// re-submitting a multipart body on retry is accepted behavior.
    pub async fn execute<T, Fut, Op>(&self, mut operation: Op) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
        Op: FnMut() -> Fut,
    {
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(&err, attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off before retry"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Delay inserted after failed attempt `attempt` (1-based).
    fn delay_for(&self, err: &ApiError, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64;
        match err {
            ApiError::RateLimited { .. } => {
                let computed =
                    Duration::from_millis((base * 2f64.powi(attempt as i32 - 1)) as u64);
                match err.retry_after() {
                    Some(advised) if advised > computed => advised,
                    _ => computed,
                }
            }
            _ => Duration::from_millis((base * 1.5f64.powi(attempt as i32 - 1)) as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records every requested delay and returns immediately.
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delays: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn server_error() -> ApiError {
        ApiError::Server {
            status: 500,
            message: None,
        }
    }

    #[tokio::test]
    async fn test_success_returns_after_one_attempt() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::with_sleeper(4, Duration::from_millis(100), sleeper.clone());
        let attempts = AtomicU32::new(0);

        let result = policy
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>(42)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_retry_ceiling_on_persistent_server_error() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::with_sleeper(3, Duration::from_millis(100), sleeper.clone());
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(ApiError::Server { status: 500, .. })));
        assert_eq!(sleeper.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_client_error_short_circuits_regardless_of_budget() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::with_sleeper(5, Duration::from_millis(100), sleeper.clone());
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Client {
                    status: 400,
                    message: None,
                })
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ApiError::Client { status: 400, .. })));
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_backoff_doubles_per_attempt() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::with_sleeper(4, Duration::from_millis(100), sleeper.clone());

        let result: Result<(), _> = policy
            .execute(|| async {
                Err(ApiError::RateLimited {
                    retry_after: None,
                    message: None,
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(
            sleeper.recorded(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
    }

    #[tokio::test]
    async fn test_larger_server_advised_delay_wins() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::with_sleeper(2, Duration::from_millis(100), sleeper.clone());

        let result: Result<(), _> = policy
            .execute(|| async {
                Err(ApiError::RateLimited {
                    retry_after: Some(Duration::from_secs(30)),
                    message: None,
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(30)]);
    }

    #[tokio::test]
    async fn test_smaller_server_advised_delay_is_ignored() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::with_sleeper(2, Duration::from_millis(5000), sleeper.clone());

        let result: Result<(), _> = policy
            .execute(|| async {
                Err(ApiError::RateLimited {
                    retry_after: Some(Duration::from_secs(1)),
                    message: None,
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(sleeper.recorded(), vec![Duration::from_millis(5000)]);
    }

    #[tokio::test]
    async fn test_transient_fault_backs_off_gently() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::with_sleeper(3, Duration::from_millis(1000), sleeper.clone());

        let result: Result<(), _> = policy
            .execute(|| async {
                Err(ApiError::Transient {
                    kind: crate::error::FaultKind::ConnectionRefused,
                    detail: "connection refused".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        // 1000 × 1.5^0, 1000 × 1.5^1
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(1000), Duration::from_millis(1500)]
        );
    }

    #[tokio::test]
    async fn test_recovery_after_transient_failures() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::with_sleeper(3, Duration::from_millis(10), sleeper.clone());
        let attempts = AtomicU32::new(0);

        let result = policy
            .execute(|| async {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(server_error())
                } else {
                    Ok("healthy")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "healthy");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
