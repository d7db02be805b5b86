//! `ScraperConfig` (§6, §4.8): tunables for a crawl, loadable from a TOML
//! file on disk with every field optional and defaulted.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Fully resolved configuration used to build a `Scraper`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScraperConfig {
    pub worker_count: usize,
    pub global_rate: f64,
    pub global_burst: u32,
    pub host_rate: f64,
    pub host_burst: u32,
    pub max_retries: usize,
    pub base_delay: Duration,
    pub breaker_threshold: usize,
    pub breaker_open_timeout: Duration,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            global_rate: 5.0,
            global_burst: 5,
            host_rate: 1.0,
            host_burst: 2,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            breaker_threshold: 5,
            breaker_open_timeout: Duration::from_secs(30),
            user_agent: "politecrawl/0.1".to_string(),
        }
    }
}

impl ScraperConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid { reason: "worker_count must be > 0".into() });
        }
        if self.global_rate <= 0.0 || self.host_rate <= 0.0 {
            return Err(ConfigError::Invalid { reason: "rates must be > 0".into() });
        }
        if self.global_burst == 0 || self.host_burst == 0 {
            return Err(ConfigError::Invalid { reason: "burst sizes must be > 0".into() });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid { reason: "max_retries must be > 0".into() });
        }
        if self.base_delay.is_zero() {
            return Err(ConfigError::Invalid { reason: "base_delay must be > 0".into() });
        }
        if self.breaker_threshold == 0 {
            return Err(ConfigError::Invalid { reason: "breaker_threshold must be > 0".into() });
        }
        Ok(())
    }
}

/// Mirrors `ScraperConfig` with every field optional, for partial TOML
/// overrides. Durations are given in milliseconds on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    worker_count: Option<usize>,
    global_rate: Option<f64>,
    global_burst: Option<u32>,
    host_rate: Option<f64>,
    host_burst: Option<u32>,
    max_retries: Option<usize>,
    base_delay_ms: Option<u64>,
    breaker_threshold: Option<usize>,
    breaker_open_timeout_ms: Option<u64>,
    user_agent: Option<String>,
}

impl ConfigFile {
    /// Reads and parses a TOML file, falling back to `ScraperConfig::default()`
    /// for any field the file does not set.
    pub fn load(path: impl AsRef<Path>) -> Result<ScraperConfig, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path_ref.display().to_string())
    }

    fn parse(text: &str, path_label: &str) -> Result<ScraperConfig, ConfigError> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path_label.to_string(), source })?;
        let config = file.into_config();
        config.validate()?;
        Ok(config)
    }

    fn into_config(self) -> ScraperConfig {
        let defaults = ScraperConfig::default();
        ScraperConfig {
            worker_count: self.worker_count.unwrap_or(defaults.worker_count),
            global_rate: self.global_rate.unwrap_or(defaults.global_rate),
            global_burst: self.global_burst.unwrap_or(defaults.global_burst),
            host_rate: self.host_rate.unwrap_or(defaults.host_rate),
            host_burst: self.host_burst.unwrap_or(defaults.host_burst),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            base_delay: self
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            breaker_threshold: self.breaker_threshold.unwrap_or(defaults.breaker_threshold),
            breaker_open_timeout: self
                .breaker_open_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.breaker_open_timeout),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = ConfigFile::parse("", "test.toml").unwrap();
        assert_eq!(config, ScraperConfig::default());
    }

    #[test]
    fn partial_overrides_leave_other_fields_default() {
        let toml = "worker_count = 10\nmax_retries = 7\n";
        let config = ConfigFile::parse(toml, "test.toml").unwrap();
        assert_eq!(config.worker_count, 10);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.global_rate, ScraperConfig::default().global_rate);
        assert_eq!(config.user_agent, ScraperConfig::default().user_agent);
    }

    #[test]
    fn zero_worker_count_is_rejected() {
        let err = ConfigFile::parse("worker_count = 0\n", "test.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = ConfigFile::parse("nonsense_field = 1\n", "test.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = ConfigFile::load("/nonexistent/path/politecrawl.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn loads_from_a_real_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("politecrawl.toml");
        std::fs::write(&path, "worker_count = 2\nbase_delay_ms = 250\n").unwrap();
        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.base_delay, Duration::from_millis(250));
    }
}
