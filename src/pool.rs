//! Worker pool / dispatcher (§4.6): fans a seed list out to N workers and
//! fans successful pages back in.

use crate::config::ScraperConfig;
use crate::error::CrawlError;
use crate::fetcher::Fetcher;
use crate::pipeline::{FetchPipeline, FetchPipelineConfig, Page};
use crate::robots::{RobotsFetcher, RobotsGate};
use crate::token_bucket::TokenBucket;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Owns the fetch pipeline and runs crawls against it.
pub struct Scraper {
    pipeline: Arc<FetchPipeline>,
    worker_count: usize,
}

impl Scraper {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        robots_fetcher: Arc<dyn RobotsFetcher>,
        config: ScraperConfig,
    ) -> Self {
        let robots = Arc::new(RobotsGate::new(config.user_agent.clone(), robots_fetcher));
        let global_limiter = Arc::new(TokenBucket::new(config.global_rate, config.global_burst));
        let retry = crate::retry::RetryPolicy::new(config.max_retries, config.base_delay);
        let pipeline = Arc::new(FetchPipeline::new(
            fetcher,
            robots,
            global_limiter,
            retry,
            FetchPipelineConfig {
                host_rate: config.host_rate,
                host_burst: config.host_burst,
                breaker: crate::circuit_breaker::CircuitBreakerConfig {
                    failure_threshold: config.breaker_threshold,
                    open_timeout: config.breaker_open_timeout,
                },
            },
        ));
        Self { pipeline, worker_count: config.worker_count }
    }

    /// Fetches every URL in `urls`, dropping per-URL failures, and returns
    /// the pages that succeeded. Never returns an error; cancellation yields
    /// a partial (possibly empty) result instead.
    pub async fn crawl(&self, cancellation: CancellationToken, urls: &[String]) -> Vec<Page> {
        let (job_tx, job_rx) = mpsc::channel::<String>(self.worker_count.max(1));
        let (result_tx, mut result_rx) = mpsc::channel::<Result<Page, CrawlError>>(
            self.worker_count.max(1),
        );
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));

        let mut workers = Vec::with_capacity(self.worker_count);
        for worker_id in 0..self.worker_count {
            let pipeline = self.pipeline.clone();
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let cancellation = cancellation.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut jobs = job_rx.lock().await;
                        tokio::select! {
                            _ = cancellation.cancelled() => None,
                            job = jobs.recv() => job,
                        }
                    };
                    let Some(url) = job else { break };

                    tracing::debug!(worker_id, url = %url, "fetching");
                    let outcome = pipeline.fetch(&cancellation, &url).await;
                    if result_tx.send(outcome).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        let producer_cancellation = cancellation.clone();
        let producer_urls = urls.to_vec();
        let producer = tokio::spawn(async move {
            for url in producer_urls {
                tokio::select! {
                    _ = producer_cancellation.cancelled() => break,
                    send_result = job_tx.send(url) => {
                        if send_result.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let closer = tokio::spawn(async move {
            let _ = producer.await;
            for worker in workers {
                let _ = worker.await;
            }
        });

        let mut pages = Vec::new();
        while let Some(outcome) = result_rx.recv().await {
            match outcome {
                Ok(page) => pages.push(page),
                Err(error) => {
                    tracing::warn!(error = %error, "dropping failed fetch");
                }
            }
        }

        let _ = closer.await;
        pages
    }
}
