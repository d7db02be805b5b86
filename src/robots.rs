//! robots.txt gate (§4.3): fetches and caches robots.txt per host, answering
//! whether a URL may be fetched and what crawl delay, if any, applies.

use crate::error::CrawlError;
use async_trait::async_trait;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Capability for fetching the raw bytes of an origin's robots.txt. `origin`
/// is `scheme://host[:port]`, matching the page URL it was derived from, so
/// robots.txt is fetched over the same scheme as the pages it gates.
/// Transport errors are returned untouched; the gate is responsible for
/// degrading them into fail-open behavior.
#[async_trait]
pub trait RobotsFetcher: Send + Sync {
    async fn fetch_robots(
        &self,
        cancellation: &CancellationToken,
        origin: &str,
    ) -> Result<Vec<u8>, CrawlError>;
}

/// Fetches `<origin>/robots.txt` with a shared `reqwest::Client`.
pub struct HttpRobotsFetcher {
    client: reqwest::Client,
}

impl HttpRobotsFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RobotsFetcher for HttpRobotsFetcher {
    async fn fetch_robots(
        &self,
        cancellation: &CancellationToken,
        origin: &str,
    ) -> Result<Vec<u8>, CrawlError> {
        let robots_url = format!("{origin}/robots.txt");
        let request = self.client.get(&robots_url).send();
        tokio::select! {
            _ = cancellation.cancelled() => Err(CrawlError::Cancelled { url: robots_url }),
            result = request => {
                let response = result.map_err(|source| CrawlError::Transport {
                    url: robots_url.clone(),
                    source,
                })?;
                let bytes = response.bytes().await.map_err(|source| CrawlError::Transport {
                    url: robots_url,
                    source,
                })?;
                Ok(bytes.to_vec())
            }
        }
    }
}

#[derive(Debug, Clone)]
struct RobotsRecord {
    body: String,
    crawl_delay: Option<Duration>,
}

/// Outcome of a gate check for one URL.
#[derive(Debug, Clone, Copy)]
pub struct GateDecision {
    pub allowed: bool,
    pub crawl_delay: Option<Duration>,
}

/// Per-origin cache of parsed robots.txt records, shared across workers.
/// Keyed by origin (`scheme://host[:port]`) rather than bare host, since
/// robots.txt applies per-origin.
pub struct RobotsGate {
    user_agent: String,
    fetcher: Arc<dyn RobotsFetcher>,
    cache: StdMutex<HashMap<String, Arc<RobotsRecord>>>,
}

impl RobotsGate {
    pub fn new(user_agent: impl Into<String>, fetcher: Arc<dyn RobotsFetcher>) -> Self {
        Self { user_agent: user_agent.into(), fetcher, cache: StdMutex::new(HashMap::new()) }
    }

    pub async fn check(
        &self,
        cancellation: &CancellationToken,
        url: &str,
    ) -> Result<GateDecision, CrawlError> {
        let parsed = Url::parse(url)
            .map_err(|source| CrawlError::InvalidUrl { url: url.to_string(), source })?;
        if parsed.host_str().is_none() {
            return Err(CrawlError::InvalidUrl { url: url.to_string(), source: url::ParseError::EmptyHost });
        }
        let origin = parsed.origin().unicode_serialization();

        let record = self.record_for_origin(cancellation, &origin).await;

        let allowed = match &record {
            Some(record) => DefaultMatcher::default().one_agent_allowed_by_robots(
                &record.body,
                &self.user_agent,
                url,
            ),
            None => true,
        };

        Ok(GateDecision { allowed, crawl_delay: record.and_then(|r| r.crawl_delay) })
    }

    async fn record_for_origin(
        &self,
        cancellation: &CancellationToken,
        origin: &str,
    ) -> Option<Arc<RobotsRecord>> {
        if let Some(cached) = self.cache.lock().expect("robots cache poisoned").get(origin) {
            return Some(cached.clone());
        }

        match self.fetcher.fetch_robots(cancellation, origin).await {
            Ok(bytes) => {
                let body = String::from_utf8_lossy(&bytes).into_owned();
                let crawl_delay = extract_crawl_delay(&body, &self.user_agent);
                let record = Arc::new(RobotsRecord { body, crawl_delay });
                self.cache
                    .lock()
                    .expect("robots cache poisoned")
                    .entry(origin.to_string())
                    .or_insert_with(|| record.clone());
                Some(record)
            }
            Err(err) => {
                tracing::warn!(origin, error = %err, "robots.txt fetch failed, failing open");
                None
            }
        }
    }
}

/// Manually scans robots.txt for a `Crawl-delay:` directive applying to
/// `user_agent` (falling back to the `*` group). Non-numeric or negative
/// values are ignored.
fn extract_crawl_delay(body: &str, user_agent: &str) -> Option<Duration> {
    let mut in_wildcard_group = false;
    let mut in_specific_group = false;
    let mut wildcard_delay: Option<Duration> = None;
    let mut specific_delay: Option<Duration> = None;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, ':');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else { continue };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                in_wildcard_group = value == "*";
                in_specific_group = value.eq_ignore_ascii_case(user_agent);
            }
            "crawl-delay" if in_wildcard_group || in_specific_group => {
                if let Ok(seconds) = value.parse::<f64>() {
                    if seconds >= 0.0 {
                        let delay = Duration::from_secs_f64(seconds);
                        if in_specific_group {
                            specific_delay = Some(delay);
                        } else {
                            wildcard_delay = Some(delay);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    specific_delay.or(wildcard_delay)
}
