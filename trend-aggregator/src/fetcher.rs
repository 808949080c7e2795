use crate::types::{FetchConfig, Platform, Result, RoundFetch, RoundHeadlines, TrendError};
use crate::utils::text::clean_title;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use trend_core::RoundEntry;
use url::Url;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    #[serde(default)]
    title: serde_json::Value,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "mobileUrl")]
    mobile_url: Option<String>,
}

impl ApiItem {
    fn title_text(&self) -> String {
        match &self.title {
            serde_json::Value::String(title) => clean_title(title),
            serde_json::Value::Null => String::new(),
            other => clean_title(&other.to_string()),
        }
    }
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true);

        if let Some(proxy_url) = &config.proxy_url {
            info!("Fetching through proxy {}", proxy_url);
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn platform_url(&self, platform_id: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}?id={}&latest",
            self.config.api_base_url, platform_id
        ))?)
    }

    /// Fetch one platform's current list, retrying with exponential backoff.
    pub async fn fetch_platform(&self, platform: &Platform) -> Result<RoundHeadlines> {
        let url = self.platform_url(&platform.id)?;
        let delay = Duration::from_secs(self.config.retry_delay_seconds);
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: delay,
            initial_interval: delay,
            max_interval: delay * 8,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.fetch_once(platform, &url).await {
                Ok(headlines) => {
                    info!(
                        "Fetched {} ({} titles)",
                        platform.display_name(),
                        headlines.len()
                    );
                    return Ok(headlines);
                }
                Err(e) => {
                    if attempt < self.config.max_retries {
                        if let Some(wait) = backoff.next_backoff() {
                            warn!(
                                "Attempt {} failed for {}: {}, retrying in {:?}",
                                attempt + 1,
                                platform.id,
                                e,
                                wait
                            );
                            last_error = Some(e);
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                    }
                    last_error = Some(e);
                    break;
                }
            }
        }

        error!(
            "Failed to fetch {} after {} attempts",
            platform.id,
            self.config.max_retries + 1
        );
        Err(last_error.unwrap_or_else(|| TrendError::General(format!("no attempt made for {}", platform.id))))
    }

    async fn fetch_once(&self, platform: &Platform, url: &Url) -> Result<RoundHeadlines> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json, text/plain, */*")
            .header("Cache-Control", "no-cache")
            .send()
            .await?
            .error_for_status()?;

        let body: ApiResponse = response.json().await?;
        if body.status != "success" && body.status != "cache" {
            return Err(TrendError::BadStatus {
                platform: platform.id.clone(),
                status: body.status,
            });
        }

        Ok(headlines_from_items(&body.items))
    }

    /// Poll every platform once, at most `max_concurrency` at a time.
    ///
    /// Failures land in `failed`; results keep the configured platform order.
    pub async fn fetch_round(&self, platforms: &[Platform]) -> RoundFetch {
        let started = Instant::now();
        info!("Fetching {} platforms", platforms.len());

        let results: Vec<(&Platform, Result<RoundHeadlines>)> = stream::iter(platforms)
            .map(|platform| async move { (platform, self.fetch_platform(platform).await) })
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut round = RoundFetch::default();
        for (platform, result) in results {
            round
                .names
                .insert(platform.id.clone(), platform.display_name().to_string());
            match result {
                Ok(headlines) => {
                    round.headlines.insert(platform.id.clone(), headlines);
                }
                Err(e) => {
                    warn!("Platform {} failed this round: {}", platform.id, e);
                    round.failed.push(platform.id.clone());
                }
            }
        }

        info!(
            "Fetched {}/{} platforms in {:.2}s",
            round.headlines.len(),
            platforms.len(),
            started.elapsed().as_secs_f64()
        );
        round
    }
}

fn headlines_from_items(items: &[ApiItem]) -> RoundHeadlines {
    let mut headlines = RoundHeadlines::new();
    for (index, item) in items.iter().enumerate() {
        let title = item.title_text();
        if title.is_empty() {
            continue;
        }
        let rank = index as u32 + 1;
        match headlines.get_mut(&title) {
            Some(entry) => entry.ranks.push(rank),
            None => {
                let entry = RoundEntry::ranked(rank).with_urls(
                    item.url.clone().unwrap_or_default(),
                    item.mobile_url.clone().unwrap_or_default(),
                );
                headlines.insert(title, entry);
            }
        }
    }
    headlines
}
