//! Per-host circuit breaker (§4.2): a lock-free three-state machine gating
//! outbound fetches to a single host.

use crate::clock::{Clock, MonotonicClock};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_HALF_OPEN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: usize,
    pub open_timeout: Duration,
}

struct Inner {
    state: AtomicU8,
    failure_count: AtomicUsize,
    opened_at_millis: AtomicU64,
}

/// A single host's breaker. Cheaply `Clone`able; clones share state.
#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::default()))
    }

    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(STATE_CLOSED),
                failure_count: AtomicUsize::new(0),
                opened_at_millis: AtomicU64::new(0),
            }),
            config,
            clock,
        }
    }

    pub fn state(&self) -> CircuitState {
        match self.inner.state.load(Ordering::Acquire) {
            STATE_CLOSED => CircuitState::Closed,
            STATE_OPEN => CircuitState::Open,
            STATE_HALF_OPEN => CircuitState::HalfOpen,
            _ => unreachable!("invalid circuit breaker state"),
        }
    }

    /// §4.2: Closed and HalfOpen always allow. Open allows exactly once it
    /// transitions itself to HalfOpen after `open_timeout` has elapsed.
    pub fn allow(&self, host: &str) -> bool {
        loop {
            match self.inner.state.load(Ordering::Acquire) {
                STATE_CLOSED => return true,
                STATE_HALF_OPEN => return true,
                STATE_OPEN => {
                    let opened_at = self.inner.opened_at_millis.load(Ordering::Acquire);
                    let elapsed = self.clock.now_millis().saturating_sub(opened_at);
                    if elapsed < self.config.open_timeout.as_millis() as u64 {
                        return false;
                    }
                    match self.inner.state.compare_exchange(
                        STATE_OPEN,
                        STATE_HALF_OPEN,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => {
                            tracing::info!(
                                host,
                                open_for = %crate::error::format_open_duration(Duration::from_millis(elapsed)),
                                "circuit breaker -> half-open"
                            );
                            return true;
                        }
                        Err(_) => continue,
                    }
                }
                _ => unreachable!("invalid circuit breaker state"),
            }
        }
    }

    pub fn success(&self, host: &str) {
        match self.inner.state.load(Ordering::Acquire) {
            STATE_HALF_OPEN => {
                if self
                    .inner
                    .state
                    .compare_exchange(
                        STATE_HALF_OPEN,
                        STATE_CLOSED,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    self.inner.failure_count.store(0, Ordering::Release);
                    tracing::info!(host, "circuit breaker -> closed");
                }
            }
            STATE_CLOSED => {
                self.inner.failure_count.store(0, Ordering::Release);
            }
            _ => {}
        }
    }

    pub fn failure(&self, host: &str) {
        let current = self.inner.state.load(Ordering::Acquire);
        match current {
            STATE_HALF_OPEN => {
                if self
                    .inner
                    .state
                    .compare_exchange(STATE_HALF_OPEN, STATE_OPEN, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    self.inner.opened_at_millis.store(self.clock.now_millis(), Ordering::Release);
                    tracing::warn!(host, "circuit breaker: half-open probe failed -> open");
                }
            }
            STATE_CLOSED => {
                let failures = self.inner.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold
                    && self
                        .inner
                        .state
                        .compare_exchange(
                            STATE_CLOSED,
                            STATE_OPEN,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                {
                    self.inner.opened_at_millis.store(self.clock.now_millis(), Ordering::Release);
                    tracing::warn!(
                        host,
                        failures,
                        threshold = self.config.failure_threshold,
                        "circuit breaker -> open"
                    );
                }
            }
            STATE_OPEN => {
                self.inner.opened_at_millis.store(self.clock.now_millis(), Ordering::Release);
            }
            _ => {}
        }
    }

    pub fn failure_count(&self) -> usize {
        self.inner.failure_count.load(Ordering::Acquire)
    }
}
