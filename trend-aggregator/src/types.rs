use serde::{Deserialize, Serialize};
use std::collections::HashMap;
pub use trend_core::{RoundHeadlines, RoundSnapshot};
use trend_core::OrderedMap;

/// A monitored ranking list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Platform {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Display name, falling back to the id when none is configured.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_concurrency: usize,
    pub proxy_url: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://newsnow.busiyi.world/api/s".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            timeout_seconds: 10,
            max_retries: 2,
            retry_delay_seconds: 3,
            max_concurrency: 10,
            proxy_url: None,
        }
    }
}

/// Result of polling every platform once.
#[derive(Debug, Clone, Default)]
pub struct RoundFetch {
    pub headlines: OrderedMap<RoundHeadlines>,
    pub names: HashMap<String, String>,
    pub failed: Vec<String>,
}

impl RoundFetch {
    pub fn into_snapshot(self, round_id: impl Into<String>) -> RoundSnapshot {
        RoundSnapshot {
            round_id: round_id.into(),
            headlines: self.headlines,
            names: self.names,
            failed: self.failed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {message} ({hint})")]
    Config { message: String, hint: String },

    #[error("Platform {platform} answered with status {status:?}")]
    BadStatus { platform: String, status: String },

    #[error("General error: {0}")]
    General(String),
}

impl TrendError {
    pub fn config(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            hint: hint.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrendError>;
