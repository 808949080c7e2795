use crate::types::{FetchConfig, Platform, Result, TrendError};
use crate::utils;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use trend_core::{RuleGroup, WeightConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_KEYWORDS_PATH: &str = "config/frequency_words.txt";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub crawler: CrawlerConfig,
    pub report: ReportConfig,
    pub weight: WeightSection,
    pub storage: StorageConfig,
    pub notification: NotificationConfig,
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub log_level: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_concurrency: usize,
    pub proxy_url: String,
    pub use_proxy: bool,
    pub enable_crawler: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        let fetch = FetchConfig::default();
        Self {
            api_base_url: fetch.api_base_url,
            request_timeout_seconds: fetch.timeout_seconds,
            max_retries: fetch.max_retries,
            retry_delay_seconds: fetch.retry_delay_seconds,
            max_concurrency: fetch.max_concurrency,
            proxy_url: String::new(),
            use_proxy: false,
            enable_crawler: true,
        }
    }
}

impl CrawlerConfig {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            api_base_url: self.api_base_url.clone(),
            timeout_seconds: self.request_timeout_seconds,
            max_retries: self.max_retries,
            retry_delay_seconds: self.retry_delay_seconds,
            max_concurrency: self.max_concurrency.max(1),
            proxy_url: (self.use_proxy && !self.proxy_url.is_empty()).then(|| self.proxy_url.clone()),
            ..FetchConfig::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub mode: String,
    pub rank_threshold: u32,
    pub output_dir: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            mode: "daily".to_string(),
            rank_threshold: 10,
            output_dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeightSection {
    pub rank_weight: f64,
    pub frequency_weight: f64,
    pub hotness_weight: f64,
}

impl Default for WeightSection {
    fn default() -> Self {
        let weights = WeightConfig::default();
        Self {
            rank_weight: weights.rank,
            frequency_weight: weights.frequency,
            hotness_weight: weights.hotness,
        }
    }
}

impl From<&WeightSection> for WeightConfig {
    fn from(section: &WeightSection) -> Self {
        Self {
            rank: section.rank_weight,
            frequency: section.frequency_weight,
            hotness: section.hotness_weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Text,
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Text => "text",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Text,
            database_url: "sqlite://output/rounds.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub batch_interval_ms: u64,
    pub feishu_url: String,
    pub dingtalk_url: String,
    pub wework_url: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_interval_ms: 1000,
            feishu_url: String::new(),
            dingtalk_url: String::new(),
            wework_url: String::new(),
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
        }
    }
}

impl NotificationConfig {
    /// Replace webhook settings with non-empty environment values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields = [
            ("FEISHU_WEBHOOK_URL", &mut self.feishu_url),
            ("DINGTALK_WEBHOOK_URL", &mut self.dingtalk_url),
            ("WEWORK_WEBHOOK_URL", &mut self.wework_url),
            ("TELEGRAM_BOT_TOKEN", &mut self.telegram_bot_token),
            ("TELEGRAM_CHAT_ID", &mut self.telegram_chat_id),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key) {
                let value = value.trim();
                if !value.is_empty() {
                    debug!("{} taken from environment", key);
                    *field = value.to_string();
                }
            }
        }
    }

    pub fn has_any_channel(&self) -> bool {
        !self.feishu_url.is_empty()
            || !self.dingtalk_url.is_empty()
            || !self.wework_url.is_empty()
            || (!self.telegram_bot_token.is_empty() && !self.telegram_chat_id.is_empty())
    }
}

impl AppConfig {
    /// Load from `path`, then `CONFIG_PATH`, then the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var("CONFIG_PATH")
                .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
                .into(),
        };

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            TrendError::config(
                format!("cannot read config file {}: {}", path.display(), e),
                "pass --config or set CONFIG_PATH",
            )
        })?;

        let mut config = Self::from_toml(&contents)?;
        config.notification.apply_env_overrides();
        info!("Loaded config from {} ({} platforms)", path.display(), config.platforms.len());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn weights(&self) -> WeightConfig {
        WeightConfig::from(&self.weight)
    }

    pub fn platform_ids(&self) -> HashSet<String> {
        self.platforms.iter().map(|p| p.id.clone()).collect()
    }
}

/// Rule groups and global filter terms from the keyword file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordRules {
    pub groups: Vec<RuleGroup>,
    pub filters: Vec<String>,
}

impl KeywordRules {
    /// Load from `path`, then `FREQUENCY_WORDS_PATH`, then the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var("FREQUENCY_WORDS_PATH")
                .unwrap_or_else(|_| DEFAULT_KEYWORDS_PATH.to_string())
                .into(),
        };

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            TrendError::config(
                format!("cannot read keyword file {}: {}", path.display(), e),
                "pass --keywords or set FREQUENCY_WORDS_PATH",
            )
        })?;

        let rules = Self::parse(&contents);
        info!(
            "Loaded {} keyword groups and {} filter terms from {}",
            rules.groups.len(),
            rules.filters.len(),
            path.display()
        );
        Ok(rules)
    }

    /// Groups are separated by blank lines. `+term` is required, `!term` is a
    /// global filter, anything else is a normal term.
    pub fn parse(contents: &str) -> Self {
        let mut rules = Self::default();
        let mut required = Vec::new();
        let mut normal = Vec::new();

        for line in contents.lines().map(str::trim).chain(std::iter::once("")) {
            if line.is_empty() {
                if !required.is_empty() || !normal.is_empty() {
                    rules.groups.push(RuleGroup::new(
                        std::mem::take(&mut required),
                        std::mem::take(&mut normal),
                    ));
                }
                continue;
            }

            if let Some(term) = line.strip_prefix('!') {
                rules.filters.push(term.trim().to_string());
            } else if let Some(term) = line.strip_prefix('+') {
                required.push(term.trim().to_string());
            } else {
                normal.push(line.to_string());
            }
        }

        rules
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    const WEIGHT_TOLERANCE: f64 = 0.01;

    pub fn validate(config: &AppConfig) -> Result<()> {
        Self::validate_weights(&config.weight)?;
        Self::validate_platforms(&config.platforms)?;
        Self::validate_report(&config.report)?;
        Self::validate_webhooks(&config.notification)?;
        debug!("Config passed validation");
        Ok(())
    }

    fn validate_weights(weight: &WeightSection) -> Result<()> {
        let named = [
            ("rank_weight", weight.rank_weight),
            ("frequency_weight", weight.frequency_weight),
            ("hotness_weight", weight.hotness_weight),
        ];
        for (name, value) in named {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrendError::config(
                    format!("{name} must be between 0 and 1, got {value}"),
                    "fix the [weight] section",
                ));
            }
        }

        let sum: f64 = named.iter().map(|(_, value)| value).sum();
        if (sum - 1.0).abs() > Self::WEIGHT_TOLERANCE {
            return Err(TrendError::config(
                format!("weights must sum to 1.0, got {sum:.3}"),
                "adjust rank_weight, frequency_weight and hotness_weight",
            ));
        }
        Ok(())
    }

    fn validate_platforms(platforms: &[Platform]) -> Result<()> {
        if platforms.is_empty() {
            return Err(TrendError::config(
                "no platforms configured",
                "add at least one [[platforms]] entry",
            ));
        }

        let mut seen = HashSet::new();
        for platform in platforms {
            if platform.id.trim().is_empty() {
                return Err(TrendError::config(
                    "platform with empty id",
                    "every [[platforms]] entry needs an id",
                ));
            }
            if !seen.insert(platform.id.as_str()) {
                return Err(TrendError::config(
                    format!("duplicate platform id {}", platform.id),
                    "platform ids must be unique",
                ));
            }
        }
        Ok(())
    }

    fn validate_report(report: &ReportConfig) -> Result<()> {
        if !matches!(report.mode.as_str(), "daily" | "current" | "incremental") {
            return Err(TrendError::config(
                format!("unknown report mode {}", report.mode),
                "use daily, current or incremental",
            ));
        }
        if report.rank_threshold == 0 {
            return Err(TrendError::config(
                "rank_threshold must be positive",
                "the default is 10",
            ));
        }
        Ok(())
    }

    fn validate_webhooks(notification: &NotificationConfig) -> Result<()> {
        let urls = [
            ("feishu_url", &notification.feishu_url),
            ("dingtalk_url", &notification.dingtalk_url),
            ("wework_url", &notification.wework_url),
        ];
        for (name, url) in urls {
            if !url.is_empty() && !utils::url::is_http_url(url) {
                return Err(TrendError::config(
                    format!("{name} is not an http(s) url: {url}"),
                    "webhook urls must start with http:// or https://",
                ));
            }
        }
        Ok(())
    }
}
