//! Token-bucket rate limiter (§4.1). Two independent instances are used by
//! the fetch pipeline: one process-wide, one per host.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Returned by [`TokenBucket::wait`] when the cancellation token fired before
/// a token became available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitCancelled;

struct State {
    tokens: f64,
    last_refill: Instant,
}

/// A capacity-`burst` bucket refilling at `rate` tokens/second.
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<State>,
}

impl TokenBucket {
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate,
            capacity: burst as f64,
            state: Mutex::new(State { tokens: burst as f64, last_refill: Instant::now() }),
        }
    }

    /// Block until one token is available, or return `Err(WaitCancelled)` if
    /// `cancellation` fires first.
    pub async fn wait(&self, cancellation: &CancellationToken) -> Result<(), WaitCancelled> {
        if cancellation.is_cancelled() {
            return Err(WaitCancelled);
        }

        loop {
            let wait_for = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }
                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.rate)
            };

            tokio::select! {
                _ = cancellation.cancelled() => return Err(WaitCancelled),
                _ = sleep(wait_for) => {}
            }
        }
    }

    fn refill(&self, state: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn burst_requests_succeed_without_waiting() {
        let bucket = TokenBucket::new(1.0, 3);
        let token = CancellationToken::new();
        let start = Instant::now();
        for _ in 0..3 {
            bucket.wait(&token).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn exhausted_bucket_blocks_until_refill() {
        let bucket = TokenBucket::new(20.0, 1);
        let token = CancellationToken::new();
        bucket.wait(&token).await.unwrap();
        let start = Instant::now();
        bucket.wait(&token).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn cancellation_wakes_a_blocked_wait() {
        let bucket = TokenBucket::new(0.1, 1);
        let token = CancellationToken::new();
        bucket.wait(&token).await.unwrap();

        let waiter_token = token.clone();
        let waiter = tokio::spawn(async move { bucket.wait(&waiter_token).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("wait should have woken promptly")
            .unwrap();
        assert_eq!(result, Err(WaitCancelled));
    }

    #[tokio::test]
    async fn already_cancelled_token_fails_fast() {
        let bucket = TokenBucket::new(1.0, 1);
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(bucket.wait(&token).await, Err(WaitCancelled));
    }
}
