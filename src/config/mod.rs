//! Configuration management for repocast
//!
//! This module handles loading and validating configuration from environment
//! variables (with `.env` support) and TOML files. The resulting `Config` is
//! immutable and passed by reference into every component constructor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::models::Category;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub discovery: DiscoveryConfig,
    pub thresholds: ThresholdsConfig,
    pub llm: LlmConfig,
    pub github: GitHubConfig,
    pub huggingface: HuggingFaceConfig,
    pub hackernews: HackerNewsConfig,
    pub site: SiteConfig,
    pub twitter: TwitterConfig,
    pub bluesky: BlueskyConfig,
    pub telegram: TelegramConfig,
    pub images: ImagesConfig,
    pub state: StateConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// One value per category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    pub general: T,
    pub astronomy: T,
    #[serde(alias = "huggingface")]
    pub model_hub: T,
}

impl<T: Copy> PerCategory<T> {
    pub fn get(&self, category: Category) -> T {
        match category {
            Category::General => self.general,
            Category::Astronomy => self.astronomy,
            Category::ModelHub => self.model_hub,
        }
    }
}

/// On-disk locations of state and archive files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub queue_file: PathBuf,
    pub history_file: PathBuf,
    /// Jekyll `_posts` directory
    pub posts_dir: PathBuf,
    /// Downloaded hero images
    pub images_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            queue_file: PathBuf::from("queue.txt"),
            history_file: PathBuf::from("history.txt"),
            posts_dir: PathBuf::from("docs/_posts"),
            images_dir: PathBuf::from("docs/assets/images"),
        }
    }
}

/// Discovery pass configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Target queue stock per category
    pub minimum_stock: usize,

    /// Candidates requested from each source
    pub max_candidates: usize,

    /// Trending search window in days
    pub trending_window_days: i64,

    /// Fixed shuffle seed; random when unset
    pub shuffle_seed: Option<u64>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            minimum_stock: 3,
            max_candidates: 20,
            trending_window_days: 7,
            shuffle_seed: None,
        }
    }
}

/// Popularity thresholds (stars or likes)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Items below this are never queued or published
    pub min_popularity: PerCategory<u64>,

    /// Items above this are accepted without asking the oracle
    pub auto_approve: PerCategory<u64>,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            min_popularity: PerCategory {
                general: 50,
                astronomy: 3,
                model_hub: 100,
            },
            auto_approve: PerCategory {
                general: 1000,
                astronomy: 200,
                model_hub: 1000,
            },
        }
    }
}

/// LLM oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,

    /// Description characters included in classification prompts
    pub prompt_char_limit: usize,

    /// README characters included in generation prompts
    pub readme_preview_chars: usize,

    pub classify_max_tokens: u32,
    pub generate_max_tokens: u32,

    /// Retries after the first attempt, recoverable errors only
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,

    /// Language the language screen checks for
    pub target_language: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: String::from("https://api.anthropic.com"),
            model: String::from("claude-sonnet-4-20250514"),
            prompt_char_limit: 500,
            readme_preview_chars: 3000,
            classify_max_tokens: 10,
            generate_max_tokens: 1024,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            target_language: String::from("English"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub api_base: String,
    pub raw_base: String,
    /// Topics searched for astronomy candidates
    pub astronomy_topics: Vec<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: String::from("https://api.github.com"),
            raw_base: String::from("https://raw.githubusercontent.com"),
            astronomy_topics: vec![String::from("astronomy"), String::from("astrophysics")],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceConfig {
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub api_base: String,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: String::from("https://huggingface.co"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub api_base: String,
    /// Top stories inspected per pass
    pub top_stories: usize,
    /// Item lookups per second
    pub requests_per_second: u32,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            api_base: String::from("https://hacker-news.firebaseio.com/v0"),
            top_stories: 50,
            requests_per_second: 5,
        }
    }
}

/// Static site archive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    /// Fixed offset of post timestamps, e.g. `+03:00`
    pub utc_offset: String,
    pub layout: String,
    /// Handlebars post template replacing the built-in one
    pub template: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://example.github.io/repo"),
            utc_offset: String::from("+03:00"),
            layout: String::from("post"),
            template: None,
        }
    }
}

impl SiteConfig {
    /// Parse `utc_offset` into a chrono offset
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
            .with_context(|| format!("Invalid site.utc_offset '{}'", self.utc_offset))
    }
}

fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, rest) = match value.chars().next()? {
        '+' => (1, &value[1..]),
        '-' => (-1, &value[1..]),
        _ => (1, value),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub enabled: bool,
    /// OAuth 2.0 user-context access token
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub api_base: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            access_token: None,
            api_base: String::from("https://api.x.com"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueskyConfig {
    pub enabled: bool,
    pub handle: Option<String>,
    #[serde(skip_serializing)]
    pub app_password: Option<String>,
    pub service: String,
    /// Post length limit in graphemes
    pub max_graphemes: usize,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            handle: None,
            app_password: None,
            service: String::from("https://bsky.social"),
            max_graphemes: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    /// Also notify when an item is dropped below threshold
    pub notify_on_reject: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: None,
            chat_id: None,
            api_base: String::from("https://api.telegram.org"),
            notify_on_reject: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Image URLs tried per README
    pub max_attempts: usize,
    /// Largest file attached to social posts
    pub social_max_bytes: u64,
    pub cleanup_max_bytes: u64,
    pub cleanup_max_age_days: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            social_max_bytes: 900_000,
            cleanup_max_bytes: 1_048_576,
            cleanup_max_age_days: 30,
        }
    }
}

/// Cross-run state protection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Guard each invocation with an advisory lock file
    pub lock: bool,
    pub stale_lock_secs: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            lock: false,
            stale_lock_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: format!("repocast/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env_string("REPOCAST_QUEUE_FILE") {
            config.paths.queue_file = PathBuf::from(path);
        }
        if let Some(path) = env_string("REPOCAST_HISTORY_FILE") {
            config.paths.history_file = PathBuf::from(path);
        }
        if let Some(stock) = env_parse("REPOCAST_MINIMUM_STOCK") {
            config.discovery.minimum_stock = stock;
        }
        if let Some(seed) = env_parse("REPOCAST_SHUFFLE_SEED") {
            config.discovery.shuffle_seed = Some(seed);
        }
        if let Some(url) = env_string("REPOCAST_SITE_BASE_URL") {
            config.site.base_url = url;
        }
        if let Some(model) = env_string("REPOCAST_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(timeout) = env_parse("REPOCAST_REQUEST_TIMEOUT") {
            config.http.request_timeout_secs = timeout;
        }
        if let Some(lock) = env_parse("REPOCAST_STATE_LOCK") {
            config.state.lock = lock;
        }
        if let Some(level) = env_string("REPOCAST_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = env_string("REPOCAST_LOG_FORMAT") {
            config.logging.format = format;
        }

        config.apply_env_secrets();
        Ok(config)
    }

    /// Load configuration from a TOML file, then overlay secrets from env
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.apply_env_secrets();
        Ok(config)
    }

    /// Credentials from the environment win over values in the file
    pub fn apply_env_secrets(&mut self) {
        let overlay = |slot: &mut Option<String>, key: &str| {
            if let Some(value) = env_string(key) {
                *slot = Some(value);
            }
        };

        overlay(&mut self.llm.api_key, "ANTHROPIC_API_KEY");
        overlay(&mut self.github.token, "GITHUB_TOKEN");
        overlay(&mut self.huggingface.token, "HF_TOKEN");
        overlay(&mut self.twitter.access_token, "TWITTER_ACCESS_TOKEN");
        overlay(&mut self.bluesky.handle, "BLUESKY_HANDLE");
        overlay(&mut self.bluesky.app_password, "BLUESKY_APP_PASSWORD");
        overlay(&mut self.telegram.bot_token, "TELEGRAM_BOT_TOKEN");
        overlay(&mut self.telegram.chat_id, "TELEGRAM_CHAT_ID");
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.discovery.minimum_stock == 0 {
            anyhow::bail!("discovery.minimum_stock must be greater than 0");
        }

        if self.discovery.max_candidates == 0 {
            anyhow::bail!("discovery.max_candidates must be greater than 0");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("http.request_timeout_secs must be greater than 0");
        }

        if self.hackernews.requests_per_second == 0 {
            anyhow::bail!("hackernews.requests_per_second must be greater than 0");
        }

        if self.bluesky.max_graphemes < 60 {
            anyhow::bail!("bluesky.max_graphemes must be at least 60");
        }

        for category in Category::PRIORITY {
            let min = self.thresholds.min_popularity.get(category);
            let auto = self.thresholds.auto_approve.get(category);
            if auto < min {
                anyhow::bail!(
                    "thresholds.auto_approve.{category} ({auto}) is below min_popularity ({min})"
                );
            }
        }

        url::Url::parse(&self.site.base_url)
            .with_context(|| format!("Invalid site.base_url '{}'", self.site.base_url))?;
        self.site.offset()?;

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("logging.format must be 'text' or 'json', got '{other}'"),
        }

        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Lock file placed next to the queue
    pub fn lock_path(&self) -> PathBuf {
        let mut path = self.paths.queue_file.as_os_str().to_owned();
        path.push(".lock");
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_minimum_stock_is_invalid() {
        let mut config = Config::default();
        config.discovery.minimum_stock = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auto_approve_below_minimum_is_invalid() {
        let mut config = Config::default();
        config.thresholds.auto_approve.astronomy = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("astronomy"));
    }

    #[test]
    fn test_request_timeout_conversion() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_per_category_lookup() {
        let thresholds = ThresholdsConfig::default();
        assert_eq!(thresholds.min_popularity.get(Category::General), 50);
        assert_eq!(thresholds.min_popularity.get(Category::Astronomy), 3);
        assert_eq!(thresholds.min_popularity.get(Category::ModelHub), 100);
    }

    #[test]
    fn test_utc_offset_parsing() {
        let site = SiteConfig::default();
        assert_eq!(site.offset().unwrap().local_minus_utc(), 3 * 3600);

        assert_eq!(
            parse_utc_offset("-05:30").map(|o| o.local_minus_utc()),
            Some(-(5 * 3600 + 30 * 60))
        );
        assert!(parse_utc_offset("soon").is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [discovery]
            minimum_stock = 5

            [thresholds.min_popularity]
            general = 10
            astronomy = 1
            huggingface = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.discovery.minimum_stock, 5);
        assert_eq!(config.discovery.max_candidates, 20);
        assert_eq!(config.thresholds.min_popularity.get(Category::ModelHub), 20);
        assert_eq!(config.thresholds.auto_approve.get(Category::General), 1000);
        assert_eq!(config.paths.queue_file, PathBuf::from("queue.txt"));
    }

    #[test]
    fn test_lock_path_sits_next_to_queue() {
        let mut config = Config::default();
        config.paths.queue_file = PathBuf::from("state/queue.txt");
        assert_eq!(config.lock_path(), PathBuf::from("state/queue.txt.lock"));
    }
}
