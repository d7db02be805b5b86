//! Error types for the crawl engine and its ambient stack.

use std::time::Duration;

/// All ways a single URL's fetch attempt, or the crawl's ambient stack, can fail.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CrawlError {
    /// The request timed out or the transport reported a retryable I/O failure.
    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server responded with a status code; `retryable` reflects §4.4's
    /// classification (429 and 5xx are retryable, other 4xx are terminal).
    #[error("{url} returned status {status}")]
    Http { url: String, status: u16, retryable: bool },

    /// The response body parsed but carried no usable `<title>`.
    #[error("{url} has no page title")]
    MissingTitle { url: String },

    /// The URL could not be parsed, or its host extracted.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// robots.txt forbids the configured user agent from fetching this URL.
    #[error("{url} is disallowed by robots.txt")]
    RobotsDisallowed { url: String },

    /// The host's circuit breaker is open.
    #[error("circuit open for host {host} ({failures} consecutive failures)")]
    CircuitOpen { host: String, failures: usize },

    /// All retry attempts were exhausted without success.
    #[error("retry exhausted for {url} after {attempts} attempts: {last}")]
    RetryExhausted { url: String, attempts: usize, last: Box<CrawlError> },

    /// The crawl's cancellation token fired while this fetch was in flight.
    #[error("crawl cancelled while fetching {url}")]
    Cancelled { url: String },
}

impl CrawlError {
    /// Classification used by the retry policy (§4.4). Cancellation and
    /// terminal errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            CrawlError::Transport { .. } => true,
            CrawlError::Http { retryable, .. } => *retryable,
            CrawlError::MissingTitle { .. }
            | CrawlError::InvalidUrl { .. }
            | CrawlError::RobotsDisallowed { .. }
            | CrawlError::CircuitOpen { .. }
            | CrawlError::RetryExhausted { .. }
            | CrawlError::Cancelled { .. } => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CrawlError::Cancelled { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            CrawlError::Transport { url, .. }
            | CrawlError::Http { url, .. }
            | CrawlError::MissingTitle { url }
            | CrawlError::InvalidUrl { url, .. }
            | CrawlError::RobotsDisallowed { url }
            | CrawlError::RetryExhausted { url, .. }
            | CrawlError::Cancelled { url } => Some(url),
            CrawlError::CircuitOpen { .. } => None,
        }
    }
}

/// Classify an HTTP status code per §4.4: 429 and 5xx are retryable.
pub fn status_is_retryable(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Errors surfaced while loading a `ScraperConfig` from disk.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// How long a host's circuit has been open, surfaced for logging only.
pub fn format_open_duration(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_is_retryable() {
        assert!(status_is_retryable(429));
    }

    #[test]
    fn http_5xx_is_retryable() {
        assert!(status_is_retryable(500));
        assert!(status_is_retryable(503));
        assert!(status_is_retryable(599));
    }

    #[test]
    fn http_4xx_other_than_429_is_terminal() {
        assert!(!status_is_retryable(400));
        assert!(!status_is_retryable(404));
    }

    #[test]
    fn http_2xx_is_not_retryable() {
        assert!(!status_is_retryable(200));
    }

    #[test]
    fn cancelled_is_never_retryable() {
        let err = CrawlError::Cancelled { url: "https://example.com".into() };
        assert!(!err.is_retryable());
        assert!(err.is_cancelled());
    }

    #[test]
    fn circuit_open_is_never_retryable() {
        let err = CrawlError::CircuitOpen { host: "example.com".into(), failures: 5 };
        assert!(!err.is_retryable());
    }

    #[test]
    fn retryable_http_carries_retryable_flag() {
        let err =
            CrawlError::Http { url: "https://example.com".into(), status: 500, retryable: true };
        assert!(err.is_retryable());
    }
}
