#![forbid(unsafe_code)]

//! # politecrawl
//!
//! A polite, concurrent web crawler core: a bounded worker pool that fetches
//! page titles from a seed list while honoring robots.txt, a two-level
//! (global + per-host) rate limiter, per-host circuit breaking, and bounded
//! retry with exponential backoff and jitter.
//!
//! The crawl engine depends only on the [`Fetcher`] and [`RobotsFetcher`]
//! capabilities; [`HttpFetcher`] and [`HttpRobotsFetcher`] are the default
//! `reqwest`-backed implementations used by the `politecrawl` binary.
//!
//! ## Quick start
//!
//! ```no_run
//! use politecrawl::{HttpFetcher, HttpRobotsFetcher, Scraper, ScraperConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = reqwest::Client::builder().build().expect("valid client");
//!     let scraper = Scraper::new(
//!         Arc::new(HttpFetcher::new(client.clone())),
//!         Arc::new(HttpRobotsFetcher::new(client)),
//!         ScraperConfig::default(),
//!     );
//!
//!     let seeds = vec!["https://example.com".to_string()];
//!     let pages = scraper.crawl(CancellationToken::new(), &seeds).await;
//!     for page in pages {
//!         println!("{} -> {}", page.url, page.title);
//!     }
//! }
//! ```

mod backoff;
mod circuit_breaker;
mod clock;
mod config;
mod error;
mod fetcher;
mod jitter;
mod pipeline;
mod pool;
mod retry;
mod robots;
mod sleeper;
mod token_bucket;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use clock::{Clock, MonotonicClock};
pub use config::{ConfigFile, ScraperConfig};
pub use error::{ConfigError, CrawlError};
pub use fetcher::{Fetcher, FetchedTitle, HttpFetcher};
pub use pipeline::{FetchPipeline, FetchPipelineConfig, Page};
pub use pool::Scraper;
pub use retry::RetryPolicy;
pub use robots::{GateDecision, HttpRobotsFetcher, RobotsFetcher, RobotsGate};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use token_bucket::TokenBucket;

pub mod prelude;
