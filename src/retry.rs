//! Retry with exponential backoff and additive jitter (§4.4).

use crate::backoff::Backoff;
use crate::error::CrawlError;
use crate::jitter;
use crate::sleeper::{Sleeper, TokioSleeper};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retries an operation up to `max_attempts` times, classifying each
/// `CrawlError` via [`CrawlError::is_retryable`]. Exactly `max_attempts`
/// attempts run; there is no sleep after the final attempt.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self { max_attempts, backoff: Backoff::new(base_delay), sleeper: Arc::new(TokioSleeper) }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub async fn execute<T, Fut, Op>(
        &self,
        cancellation: &CancellationToken,
        url: &str,
        mut operation: Op,
    ) -> Result<T, CrawlError>
    where
        Fut: Future<Output = Result<T, CrawlError>>,
        Op: FnMut() -> Fut,
    {
        let mut last_error: Option<CrawlError> = None;

        for attempt in 0..self.max_attempts {
            if cancellation.is_cancelled() {
                return Err(CrawlError::Cancelled { url: url.to_string() });
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_cancelled() || !error.is_retryable() => return Err(error),
                Err(error) => {
                    tracing::debug!(url, attempt, "retrying after transient failure");
                    last_error = Some(error);

                    if attempt + 1 >= self.max_attempts {
                        break;
                    }

                    let delay = jitter::apply(self.backoff.delay(attempt));
                    tokio::select! {
                        _ = cancellation.cancelled() => return Err(CrawlError::Cancelled { url: url.to_string() }),
                        _ = self.sleeper.sleep(delay) => {}
                    }
                }
            }
        }

        let last = last_error.expect("retry loop always records a failure before exhausting");
        tracing::error!(url, attempts = self.max_attempts, "retry exhausted");
        Err(CrawlError::RetryExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last: Box::new(last),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeper::{InstantSleeper, TrackingSleeper};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn http_error(url: &str, status: u16) -> CrawlError {
        CrawlError::Http {
            url: url.to_string(),
            status,
            retryable: crate::error::status_is_retryable(status),
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt_without_retrying() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10)).with_sleeper(Arc::new(InstantSleeper));
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let result = policy
            .execute(&token, "https://example.com", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CrawlError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1)).with_sleeper(Arc::new(InstantSleeper));
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let result = policy
            .execute(&token, "https://example.com", || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(http_error("https://example.com", 503))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts_with_no_trailing_sleep() {
        let sleeper = Arc::new(TrackingSleeper::new());
        let policy = RetryPolicy::new(3, Duration::from_millis(100)).with_sleeper(sleeper.clone());
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let result = policy
            .execute(&token, "https://example.com", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(http_error("https://example.com", 500))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.calls(), 2, "no sleep after the final attempt");
        match result.unwrap_err() {
            CrawlError::RetryExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminal_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1)).with_sleeper(Arc::new(InstantSleeper));
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let result = policy
            .execute(&token, "https://example.com", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(http_error("https://example.com", 400))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), CrawlError::Http { status: 400, .. }));
    }

    #[tokio::test]
    async fn backoff_delays_double_each_attempt() {
        let sleeper = Arc::new(TrackingSleeper::new());
        let policy = RetryPolicy::new(4, Duration::from_millis(100)).with_sleeper(sleeper.clone());
        let token = CancellationToken::new();

        let _ = policy
            .execute(&token, "https://example.com", || async {
                Err::<(), _>(http_error("https://example.com", 500))
            })
            .await;

        assert_eq!(sleeper.calls(), 3);
        assert!(sleeper.call_at(0).unwrap() >= Duration::from_millis(100));
        assert!(sleeper.call_at(1).unwrap() >= Duration::from_millis(200));
        assert!(sleeper.call_at(2).unwrap() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn cancellation_short_circuits_the_loop() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1)).with_sleeper(Arc::new(InstantSleeper));
        let token = CancellationToken::new();
        token.cancel();

        let result = policy
            .execute(&token, "https://example.com", || async {
                Ok::<_, CrawlError>(42)
            })
            .await;

        assert!(matches!(result.unwrap_err(), CrawlError::Cancelled { .. }));
    }
}
