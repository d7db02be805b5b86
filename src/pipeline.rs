//! Fetch pipeline (§4.5): composes the robots gate, rate limiters, circuit
//! breaker and retry policy around a single `Fetcher` call per URL.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::error::CrawlError;
use crate::fetcher::Fetcher;
use crate::retry::RetryPolicy;
use crate::robots::RobotsGate;
use crate::token_bucket::TokenBucket;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub title: String,
}

pub struct FetchPipelineConfig {
    pub host_rate: f64,
    pub host_burst: u32,
    pub breaker: CircuitBreakerConfig,
}

/// Owns the per-host rate limiters and breakers; shared by every worker.
pub struct FetchPipeline {
    fetcher: Arc<dyn Fetcher>,
    robots: Arc<RobotsGate>,
    global_limiter: Arc<TokenBucket>,
    retry: RetryPolicy,
    config: FetchPipelineConfig,
    host_limiters: Mutex<HashMap<String, Arc<TokenBucket>>>,
    host_breakers: Mutex<HashMap<String, CircuitBreaker>>,
}

impl FetchPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        robots: Arc<RobotsGate>,
        global_limiter: Arc<TokenBucket>,
        retry: RetryPolicy,
        config: FetchPipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            robots,
            global_limiter,
            retry,
            config,
            host_limiters: Mutex::new(HashMap::new()),
            host_breakers: Mutex::new(HashMap::new()),
        }
    }

    pub async fn fetch(
        &self,
        cancellation: &CancellationToken,
        url: &str,
    ) -> Result<Page, CrawlError> {
        let host = extract_host(url)?;

        let decision = self.robots.check(cancellation, url).await?;
        if !decision.allowed {
            return Err(CrawlError::RobotsDisallowed { url: url.to_string() });
        }
        if let Some(delay) = decision.crawl_delay {
            tokio::select! {
                _ = cancellation.cancelled() => return Err(CrawlError::Cancelled { url: url.to_string() }),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let host_limiter = self.host_limiter(&host);
        let breaker = self.breaker(&host);

        if !breaker.allow(&host) {
            return Err(CrawlError::CircuitOpen { host, failures: breaker.failure_count() });
        }

        let fetcher = self.fetcher.clone();
        let result = self
            .retry
            .execute(cancellation, url, || {
                let fetcher = fetcher.clone();
                let host_limiter = host_limiter.clone();
                async move {
                    self.global_limiter
                        .wait(cancellation)
                        .await
                        .map_err(|_| CrawlError::Cancelled { url: url.to_string() })?;
                    host_limiter
                        .wait(cancellation)
                        .await
                        .map_err(|_| CrawlError::Cancelled { url: url.to_string() })?;
                    fetcher.fetch_title(cancellation, url).await
                }
            })
            .await;

        match result {
            Ok(fetched) => {
                breaker.success(&host);
                Ok(Page { url: url.to_string(), title: fetched.title })
            }
            Err(error) => {
                if !error.is_cancelled() {
                    breaker.failure(&host);
                }
                Err(error)
            }
        }
    }

    fn host_limiter(&self, host: &str) -> Arc<TokenBucket> {
        let mut limiters = self.host_limiters.lock().expect("host limiter map poisoned");
        limiters
            .entry(host.to_string())
            .or_insert_with(|| {
                Arc::new(TokenBucket::new(self.config.host_rate, self.config.host_burst))
            })
            .clone()
    }

    fn breaker(&self, host: &str) -> CircuitBreaker {
        let mut breakers = self.host_breakers.lock().expect("breaker map poisoned");
        breakers
            .entry(host.to_string())
            .or_insert_with(|| CircuitBreaker::new(self.config.breaker.clone()))
            .clone()
    }
}

fn extract_host(url: &str) -> Result<String, CrawlError> {
    let parsed =
        Url::parse(url).map_err(|source| CrawlError::InvalidUrl { url: url.to_string(), source })?;
    parsed
        .host_str()
        .map(|h| h.to_string())
        .ok_or_else(|| CrawlError::InvalidUrl { url: url.to_string(), source: url::ParseError::EmptyHost })
}
