//! Scraper tunables loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file or no file at all is valid.
//!
//! ```yaml
//! scrape_interval_minutes: 90
//! request_timeout_secs: 15
//! batch_size: 10
//! batch_pause_secs: 30
//! source_pause_secs: 2
//! max_retries: 0
//! retry_base_delay_ms: 1000
//! ```

use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScraperConfig {
    /// Wait between the end of one cycle and the start of the next.
    pub scrape_interval_minutes: u64,
    pub request_timeout_secs: u64,
    /// Accepted articles per batch pause.
    pub batch_size: usize,
    pub batch_pause_secs: u64,
    pub source_pause_secs: u64,
    /// Retries per source page for transient failures; 0 disables retrying.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    /// Overrides the built-in browser User-Agent.
    pub user_agent: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            scrape_interval_minutes: 90,
            request_timeout_secs: 15,
            batch_size: 10,
            batch_pause_secs: 30,
            source_pause_secs: 2,
            max_retries: 0,
            retry_base_delay_ms: 1000,
            user_agent: None,
        }
    }
}

impl ScraperConfig {
    pub fn from_yaml(contents: &str) -> Result<Self, Box<dyn Error>> {
        let config: ScraperConfig = if contents.trim().is_empty() {
            ScraperConfig::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or the defaults when no path is given.
    ///
    /// # Arguments
    ///
    /// * `path` - YAML file with any subset of the tunables; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains unknown keys, or
    /// sets `batch_size` or `request_timeout_secs` to zero.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path).await?;
        let config = Self::from_yaml(&contents)?;
        info!(?config, "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_secs(self.batch_pause_secs)
    }

    pub fn source_pause(&self) -> Duration {
        Duration::from_secs(self.source_pause_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_operator_template() {
        let config = ScraperConfig::default();
        assert_eq!(config.scrape_interval(), Duration::from_secs(90 * 60));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_pause(), Duration::from_secs(30));
        assert_eq!(config.source_pause(), Duration::from_secs(2));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ScraperConfig::from_yaml("batch_pause_secs: 5\nmax_retries: 2\n").unwrap();
        assert_eq!(config.batch_pause_secs, 5);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ScraperConfig::from_yaml("").unwrap(), ScraperConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(ScraperConfig::from_yaml("batch_pause: 5").is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(ScraperConfig::from_yaml("batch_size: 0").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "scrape_interval_minutes: 15\nuser_agent: test-agent\n").unwrap();
        let config = ScraperConfig::load(path.to_str()).await.unwrap();
        assert_eq!(config.scrape_interval_minutes, 15);
        assert_eq!(config.user_agent.as_deref(), Some("test-agent"));
    }

    #[tokio::test]
    async fn test_load_without_path() {
        assert_eq!(ScraperConfig::load(None).await.unwrap(), ScraperConfig::default());
    }
}
