use super::{MessageStyle, WebhookClient, render_message};
use crate::report::{RankMarkup, ReportData};
use crate::traits::Notifier;
use crate::types::{Result, TrendError};
use crate::utils::text::html_escape;
use crate::utils::time::{beijing_now, timestamp_label};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const TELEGRAM_MAX_BYTES: usize = 4000;
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

struct TelegramStyle;

impl RankMarkup for TelegramStyle {
    fn highlight(&self, range: &str) -> String {
        format!("<b>{range}</b>")
    }
}

impl MessageStyle for TelegramStyle {
    fn bold(&self, text: &str) -> String {
        format!("<b>{text}</b>")
    }

    fn link(&self, title: &str, url: &str) -> String {
        format!("<a href=\"{}\">{title}</a>", html_escape(url))
    }

    fn escape(&self, text: &str) -> String {
        html_escape(text)
    }
}

/// Telegram bot `sendMessage` with HTML parse mode.
pub struct TelegramNotifier {
    webhook: WebhookClient,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str, proxy_url: Option<&str>, batch_interval: Duration) -> Result<Self> {
        Self::with_api_base(TELEGRAM_API_BASE, bot_token, chat_id, proxy_url, batch_interval)
    }

    pub fn with_api_base(
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
        proxy_url: Option<&str>,
        batch_interval: Duration,
    ) -> Result<Self> {
        let url = format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token);
        Ok(Self {
            webhook: WebhookClient::new(url, proxy_url, batch_interval)?,
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    fn render(&self, report: &ReportData) -> String {
        render_message(report, &TelegramStyle, &timestamp_label(&beijing_now()))
    }

    fn payload(&self, content: &str, _report_type: &str) -> serde_json::Value {
        json!({
            "chat_id": self.chat_id,
            "text": content,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        })
    }

    fn max_bytes(&self) -> usize {
        TELEGRAM_MAX_BYTES
    }

    fn batch_interval(&self) -> Duration {
        self.webhook.batch_interval()
    }

    async fn deliver(&self, payload: &serde_json::Value) -> Result<()> {
        let answer = self.webhook.post(self.channel(), payload).await?;
        if answer.get("ok").and_then(|ok| ok.as_bool()) == Some(true) {
            Ok(())
        } else {
            Err(TrendError::General(format!(
                "telegram rejected message: {}",
                answer.get("description").and_then(|d| d.as_str()).unwrap_or("no description")
            )))
        }
    }
}
