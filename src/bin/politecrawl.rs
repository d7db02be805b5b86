//! CLI entry point: loads configuration, builds the HTTP-backed fetcher and
//! robots fetcher, runs a crawl over the given seeds, and prints the results.

use clap::Parser;
use politecrawl::{ConfigFile, HttpFetcher, HttpRobotsFetcher, Scraper, ScraperConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// A polite, concurrent web crawler that fetches page titles from a list of seed URLs.
#[derive(Parser, Debug)]
#[command(name = "politecrawl", version, about)]
struct Args {
    /// Path to a TOML config file overriding the built-in defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to a file with one seed URL per line.
    #[arg(long, value_name = "PATH")]
    seeds_file: Option<PathBuf>,

    /// Seed URLs to crawl, in addition to any loaded from --seeds-file.
    seeds: Vec<String>,
}

fn load_seeds(args: &Args) -> Vec<String> {
    let mut seeds = args.seeds.clone();
    if let Some(path) = &args.seeds_file {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                seeds.extend(contents.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from));
            }
            Err(err) => {
                eprintln!("failed to read seeds file {}: {err}", path.display());
                std::process::exit(1);
            }
        }
    }
    seeds
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match ConfigFile::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load config: {err}");
                std::process::exit(1);
            }
        },
        None => ScraperConfig::default(),
    };

    let seeds = load_seeds(&args);
    if seeds.is_empty() {
        eprintln!("no seed URLs supplied; pass them as arguments or via --seeds-file");
        std::process::exit(1);
    }

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
        .expect("reqwest client configuration is valid");

    let scraper = Scraper::new(
        Arc::new(HttpFetcher::new(client.clone())),
        Arc::new(HttpRobotsFetcher::new(client)),
        config,
    );

    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt, winding down crawl");
            ctrl_c_token.cancel();
        }
    });

    let pages = scraper.crawl(cancellation, &seeds).await;
    for page in &pages {
        println!("{} -> {}", page.url, page.title);
    }
}
