//! Convenient re-exports for common `politecrawl` types.
pub use crate::{
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
    config::{ConfigFile, ScraperConfig},
    error::{ConfigError, CrawlError},
    fetcher::{Fetcher, FetchedTitle, HttpFetcher},
    pipeline::{FetchPipeline, FetchPipelineConfig, Page},
    pool::Scraper,
    retry::RetryPolicy,
    robots::{GateDecision, HttpRobotsFetcher, RobotsFetcher, RobotsGate},
};
