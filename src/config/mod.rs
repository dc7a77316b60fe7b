//! Configuration management for blogcircles
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetching configuration
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Batch orchestration configuration
    #[serde(default)]
    pub batch: BatchConfig,

    /// Circle scraper configuration
    #[serde(default)]
    pub circles: CirclesConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// HTTP fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// User agent string
    #[serde(default = "default_crawl_user_agent")]
    pub user_agent: String,

    /// Accept-Language header sent with every request
    #[serde(default = "default_crawl_accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "default_crawl_timeout")]
    pub timeout_secs: u64,

    /// Attempts per fetch; only transport failures are retried
    #[serde(default = "default_crawl_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between attempts in milliseconds
    #[serde(default = "default_crawl_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Maximum redirects to follow
    #[serde(default = "default_crawl_max_redirects")]
    pub max_redirects: usize,

    /// Encoding label used for undeclared, non-UTF-8 pages
    #[serde(default = "default_crawl_fallback_encoding")]
    pub fallback_encoding: String,
}

/// How a batch is dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Worker pool; pool width is the only rate limit
    #[default]
    Parallel,
    /// One site at a time with a fixed delay between sites
    Careful,
}

/// Batch orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Frontier entries drained per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Worker pool width in parallel mode
    #[serde(default = "default_batch_workers")]
    pub workers: usize,

    /// Dispatch mode
    #[serde(default)]
    pub mode: BatchMode,

    /// Delay between sites in careful mode (milliseconds)
    #[serde(default = "default_batch_careful_delay")]
    pub careful_delay_ms: u64,

    /// Node count at which continuous mode stops
    #[serde(default = "default_batch_target")]
    pub target: usize,

    /// Pause between batches in continuous mode (milliseconds)
    #[serde(default = "default_batch_pause")]
    pub batch_pause_ms: u64,

    /// Look for a friend-links page on every site
    #[serde(default = "default_true")]
    pub discover_friends: bool,

    /// Probe archive pages for a better article count
    #[serde(default = "default_true")]
    pub count_archives: bool,

    /// Probe conventional feed paths when the homepage advertises none
    #[serde(default = "default_false")]
    pub probe_feeds: bool,

    /// Conventional friend-link paths, probed in order
    #[serde(default = "default_friend_paths")]
    pub friend_paths: Vec<String>,

    /// Archive listing paths, probed in order
    #[serde(default = "default_archive_paths")]
    pub archive_paths: Vec<String>,
}

/// A circle whose members are scraped from the links on one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPageCircle {
    /// Display name of the circle
    pub name: String,
    /// Circle homepage; used as the edge target
    pub url: String,
    /// Member listing page (defaults to `url`)
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Circle scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CirclesConfig {
    /// Scrape Travellings through its JSON API
    #[serde(default = "default_true")]
    pub travellings: bool,

    /// Sample BlogsCN through its random-blog API
    #[serde(default = "default_true")]
    pub blogscn: bool,

    /// Scrape Foreverblog member pages
    #[serde(default = "default_true")]
    pub foreverblog: bool,

    /// Random-sample budget for circles without a member list
    #[serde(default = "default_circle_random_attempts")]
    pub random_attempts: usize,

    /// Delay between circle requests (milliseconds)
    #[serde(default = "default_circle_request_delay")]
    pub request_delay_ms: u64,

    /// Cap on member pages fetched from a circle index
    #[serde(default = "default_circle_max_member_pages")]
    pub max_member_pages: usize,

    /// Circles scraped from a plain member listing page
    #[serde(default = "default_circle_link_pages")]
    pub link_pages: Vec<LinkPageCircle>,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for blogcircles data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Directory holding the node, edge, circle and queue files
    pub data_dir: PathBuf,

    /// Timestamped crawl log
    pub log_file: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: default_crawl_user_agent(),
            accept_language: default_crawl_accept_language(),
            timeout_secs: default_crawl_timeout(),
            max_attempts: default_crawl_max_attempts(),
            retry_backoff_ms: default_crawl_retry_backoff(),
            max_redirects: default_crawl_max_redirects(),
            fallback_encoding: default_crawl_fallback_encoding(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_batch_workers(),
            mode: BatchMode::default(),
            careful_delay_ms: default_batch_careful_delay(),
            target: default_batch_target(),
            batch_pause_ms: default_batch_pause(),
            discover_friends: true,
            count_archives: true,
            probe_feeds: false,
            friend_paths: default_friend_paths(),
            archive_paths: default_archive_paths(),
        }
    }
}

impl Default for CirclesConfig {
    fn default() -> Self {
        Self {
            travellings: true,
            blogscn: true,
            foreverblog: true,
            random_attempts: default_circle_random_attempts(),
            request_delay_ms: default_circle_request_delay(),
            max_member_pages: default_circle_max_member_pages(),
            link_pages: default_circle_link_pages(),
        }
    }
}

impl PathsConfig {
    fn for_base(base: PathBuf, config_file: PathBuf) -> Self {
        Self {
            config_file,
            data_dir: base.join("data"),
            log_file: base.join("logs").join("crawl.log"),
            base_dir: base,
        }
    }
}

impl Config {
    /// Get the default base directory for blogcircles (~/.blogcircles)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".blogcircles")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Default configuration rooted at the directory holding `config_path`
    pub fn default_at(config_path: &Path) -> Self {
        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self {
            paths: PathsConfig::for_base(base, config_path.to_path_buf()),
            ..Self::default()
        }
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig::for_base(base, config_path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    /// Load `config_path` if it exists, otherwise defaults rooted beside it
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        debug!("{:?} missing, using defaults", config_path);
        let config = Self::default_at(config_path);
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.crawl.user_agent.trim().is_empty() {
            return Err(Error::Config("crawl.user_agent must not be empty".to_string()));
        }

        if self.crawl.max_attempts == 0 {
            return Err(Error::Config("crawl.max_attempts must be >= 1".to_string()));
        }

        if self.crawl.timeout_secs == 0 {
            return Err(Error::Config("crawl.timeout_secs must be positive".to_string()));
        }

        if encoding_rs::Encoding::for_label(self.crawl.fallback_encoding.as_bytes()).is_none() {
            return Err(Error::Config(format!(
                "crawl.fallback_encoding '{}' is not a known encoding",
                self.crawl.fallback_encoding
            )));
        }

        if self.batch.batch_size == 0 {
            return Err(Error::Config("batch.batch_size must be >= 1".to_string()));
        }

        if self.batch.workers == 0 {
            return Err(Error::Config("batch.workers must be >= 1".to_string()));
        }

        for circle in &self.circles.link_pages {
            url::Url::parse(&circle.url).map_err(|e| {
                Error::Config(format!("circles.link_pages '{}': {}", circle.name, e))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.crawl.timeout_secs, 15);
        assert_eq!(config.crawl.max_attempts, 2);
        assert_eq!(config.batch.workers, 20);
        assert_eq!(config.batch.mode, BatchMode::Parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let mut config = Config::default_at(&path);
        config.batch.batch_size = 7;
        config.batch.mode = BatchMode::Careful;

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded.batch.batch_size, 7);
        assert_eq!(loaded.batch.mode, BatchMode::Careful);
        assert_eq!(loaded.paths.data_dir, tmp.path().join("data"));
    }

    #[test]
    fn test_missing_file_roots_defaults_beside_it() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.paths.data_dir, tmp.path().join("nested").join("data"));
        assert!(!path.exists());
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[batch]\nworkers = 4\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.batch.workers, 4);
        assert_eq!(config.batch.batch_size, 50);
        assert_eq!(config.crawl.accept_language, "zh-CN,zh;q=0.9,en;q=0.8");
        assert_eq!(config.paths.log_file, tmp.path().join("logs").join("crawl.log"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.batch.workers = 0;
        assert!(config.validate().is_err());
        config.batch.workers = 3;
        assert!(config.validate().is_ok());

        config.crawl.fallback_encoding = "not-a-charset".to_string();
        assert!(config.validate().is_err());
        config.crawl.fallback_encoding = "utf-8".to_string();

        config.crawl.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
