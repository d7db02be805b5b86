//! The `Fetcher` capability (§6) and its default HTTP-backed implementation.

use crate::error::{status_is_retryable, CrawlError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;

/// A successful fetch: the extracted page title and the HTTP status that
/// produced it.
#[derive(Debug, Clone)]
pub struct FetchedTitle {
    pub title: String,
    pub status: u16,
}

/// Capability consumed by the fetch pipeline. Implementations own however
/// they talk HTTP and parse HTML; the core only needs a title back.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_title(
        &self,
        cancellation: &CancellationToken,
        url: &str,
    ) -> Result<FetchedTitle, CrawlError>;
}

/// Fetches a URL with a shared `reqwest::Client` and extracts the first
/// `<title>` element with `scraper`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_title(
        &self,
        cancellation: &CancellationToken,
        url: &str,
    ) -> Result<FetchedTitle, CrawlError> {
        let request = self.client.get(url).send();
        let response = tokio::select! {
            _ = cancellation.cancelled() => return Err(CrawlError::Cancelled { url: url.to_string() }),
            result = request => result.map_err(|source| CrawlError::Transport {
                url: url.to_string(),
                source,
            })?,
        };

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(CrawlError::Http {
                url: url.to_string(),
                status,
                retryable: status_is_retryable(status),
            });
        }

        let body = tokio::select! {
            _ = cancellation.cancelled() => return Err(CrawlError::Cancelled { url: url.to_string() }),
            result = response.text() => result.map_err(|source| CrawlError::Transport {
                url: url.to_string(),
                source,
            })?,
        };

        let title = extract_title(&body)
            .ok_or_else(|| CrawlError::MissingTitle { url: url.to_string() })?;

        Ok(FetchedTitle { title, status })
    }
}

fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}
