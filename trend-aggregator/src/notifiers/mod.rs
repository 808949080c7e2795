pub mod dingtalk;
pub mod feishu;
pub mod telegram;
pub mod wework;

pub use dingtalk::DingTalkNotifier;
pub use feishu::FeishuNotifier;
pub use telegram::TelegramNotifier;
pub use wework::WeWorkNotifier;

use crate::config::NotificationConfig;
use crate::report::{RankMarkup, ReportData, ReportHeadline, format_rank};
use crate::traits::Notifier;
use crate::types::{Result, TrendError};
use crate::utils::text::{clean_title, truncate_bytes};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Text decoration used by a channel's message renderer.
pub trait MessageStyle: RankMarkup {
    fn bold(&self, text: &str) -> String;

    fn link(&self, title: &str, url: &str) -> String;

    /// Secondary text such as source names and timestamps.
    fn muted(&self, text: &str) -> String {
        text.to_string()
    }

    /// Failed platform ids.
    fn alert(&self, text: &str) -> String {
        self.bold(text)
    }

    /// Escaping applied to every piece of report text before decoration.
    fn escape(&self, text: &str) -> String {
        text.to_string()
    }

    fn separator(&self) -> &str {
        "---"
    }
}

/// Render a report as chat message text in the given style.
pub fn render_message<S: MessageStyle>(report: &ReportData, style: &S, generated_at: &str) -> String {
    let mut text = String::new();

    if report.stats.is_empty() {
        text.push_str(&format!("📭 {}\n\n", report.empty_message()));
    } else {
        text.push_str(&format!("📊 {}\n\n", style.bold("热点词汇统计")));
        let total = report.stats.len();

        for (index, group) in report.stats.iter().enumerate() {
            let sequence = style.muted(&format!("[{}/{}]", index + 1, total));
            let word = style.bold(&style.escape(&group.word));
            let count = group.count();
            let icon = match count {
                10.. => "🔥",
                5..=9 => "📈",
                _ => "📌",
            };
            text.push_str(&format!("{icon} {sequence} {word} : {count} 条\n\n"));

            for (position, headline) in group.titles.iter().enumerate() {
                text.push_str(&format!(
                    "  {}. {}\n",
                    position + 1,
                    format_headline(headline, report.rank_threshold, style, true)
                ));
                if position + 1 < group.titles.len() {
                    text.push('\n');
                }
            }

            if index + 1 < total {
                text.push_str(&format!("\n{}\n\n", style.separator()));
            }
        }
    }

    if !report.new_titles.is_empty() {
        if !report.stats.is_empty() {
            text.push_str(&format!("\n{}\n\n", style.separator()));
        }
        text.push_str(&format!(
            "🆕 {} (共 {} 条)\n\n",
            style.bold("本次新增热点新闻"),
            report.total_new_count
        ));
        for source in &report.new_titles {
            text.push_str(&format!(
                "{} ({} 条):\n",
                style.bold(&style.escape(&source.source_name)),
                source.titles.len()
            ));
            for (position, headline) in source.titles.iter().enumerate() {
                text.push_str(&format!(
                    "  {}. {}\n",
                    position + 1,
                    format_headline(headline, report.rank_threshold, style, false)
                ));
            }
            text.push('\n');
        }
    }

    if !report.failed_ids.is_empty() {
        if !report.stats.is_empty() {
            text.push_str(&format!("\n{}\n\n", style.separator()));
        }
        text.push_str(&format!("⚠️ {}\n\n", style.bold("数据获取失败的平台：")));
        for id in &report.failed_ids {
            text.push_str(&format!("  • {}\n", style.alert(&style.escape(id))));
        }
    }

    text.push_str(&format!("\n\n{}", style.muted(&format!("更新时间：{generated_at}"))));
    text
}

/// One headline line. New-arrival listings drop the source and the new marker.
fn format_headline<S: MessageStyle>(
    headline: &ReportHeadline,
    rank_threshold: u32,
    style: &S,
    in_group: bool,
) -> String {
    let title = style.escape(&clean_title(&headline.title));
    let link = headline.link();
    let mut line = String::new();

    if in_group {
        line.push_str(&style.muted(&format!("[{}]", style.escape(&headline.source_name))));
        line.push(' ');
        if headline.is_new {
            line.push_str("🆕 ");
        }
    }

    if link.is_empty() {
        line.push_str(&title);
    } else {
        line.push_str(&style.link(&title, link));
    }

    if !headline.ranks.is_empty() {
        line.push(' ');
        line.push_str(&format_rank(&headline.ranks, rank_threshold, style));
    }
    if !headline.time_display.is_empty() {
        line.push(' ');
        line.push_str(&style.muted(&format!("- {}", headline.time_display)));
    }
    if headline.count > 1 {
        line.push_str(&format!(" ({}次)", headline.count));
    }
    line
}

/// Split `content` on line boundaries so that no batch exceeds `max_bytes`
/// UTF-8 bytes. A single line longer than the limit is truncated.
pub fn split_into_batches(content: &str, max_bytes: usize) -> Vec<String> {
    if content.len() <= max_bytes {
        return vec![content.to_string()];
    }

    let mut batches = Vec::new();
    let mut current = String::new();

    for line in content.split('\n') {
        let line = truncate_bytes(line, max_bytes.saturating_sub(1));
        if current.len() + line.len() + 1 > max_bytes && !current.is_empty() {
            batches.push(current.trim_end().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }

    let tail = current.trim_end();
    if !tail.is_empty() {
        batches.push(tail.to_string());
    }

    batches.retain(|batch| !batch.is_empty());
    if batches.is_empty() {
        batches.push(truncate_bytes(content, max_bytes).to_string());
    }
    debug!("Split {} bytes into {} batches", content.len(), batches.len());
    batches
}

/// HTTP side shared by every webhook channel.
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
    batch_interval: Duration,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, proxy_url: Option<&str>, batch_interval: Duration) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if let Some(proxy_url) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
            batch_interval,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn batch_interval(&self) -> Duration {
        self.batch_interval
    }

    /// POST `payload`, requiring a 2xx answer, and return the decoded body
    /// (`Null` when it is not JSON).
    pub async fn post(&self, channel: &str, payload: &serde_json::Value) -> Result<serde_json::Value> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("{} webhook answered {}", channel, status);
            return Err(TrendError::General(format!("{channel} webhook answered HTTP {status}")));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }
}

/// Notifiers for every channel configured in `config`.
pub fn build_notifiers(config: &NotificationConfig, proxy_url: Option<&str>) -> Result<Vec<Box<dyn Notifier>>> {
    let interval = Duration::from_millis(config.batch_interval_ms);
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if !config.feishu_url.is_empty() {
        notifiers.push(Box::new(FeishuNotifier::new(WebhookClient::new(
            &config.feishu_url,
            proxy_url,
            interval,
        )?)));
    }
    if !config.dingtalk_url.is_empty() {
        notifiers.push(Box::new(DingTalkNotifier::new(WebhookClient::new(
            &config.dingtalk_url,
            proxy_url,
            interval,
        )?)));
    }
    if !config.wework_url.is_empty() {
        notifiers.push(Box::new(WeWorkNotifier::new(WebhookClient::new(
            &config.wework_url,
            proxy_url,
            interval,
        )?)));
    }
    if !config.telegram_bot_token.is_empty() && !config.telegram_chat_id.is_empty() {
        notifiers.push(Box::new(TelegramNotifier::new(
            &config.telegram_bot_token,
            &config.telegram_chat_id,
            proxy_url,
            interval,
        )?));
    }

    Ok(notifiers)
}
