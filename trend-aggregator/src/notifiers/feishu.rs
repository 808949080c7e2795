use super::{MessageStyle, WebhookClient, render_message};
use crate::report::{RankMarkup, ReportData};
use crate::traits::Notifier;
use crate::types::Result;
use crate::utils::time::{beijing_now, timestamp_label};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const FEISHU_MAX_BYTES: usize = 29000;
const FEISHU_SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━";

struct FeishuStyle;

impl RankMarkup for FeishuStyle {
    fn highlight(&self, range: &str) -> String {
        format!("<font color='red'>**{range}**</font>")
    }
}

impl MessageStyle for FeishuStyle {
    fn bold(&self, text: &str) -> String {
        format!("**{text}**")
    }

    fn link(&self, title: &str, url: &str) -> String {
        format!("[{title}]({url})")
    }

    fn muted(&self, text: &str) -> String {
        format!("<font color='grey'>{text}</font>")
    }

    fn alert(&self, text: &str) -> String {
        format!("<font color='red'>{text}</font>")
    }

    fn separator(&self) -> &str {
        FEISHU_SEPARATOR
    }
}

/// Feishu custom bot. Any 2xx answer counts as delivered.
pub struct FeishuNotifier {
    webhook: WebhookClient,
}

impl FeishuNotifier {
    pub fn new(webhook: WebhookClient) -> Self {
        Self { webhook }
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    fn channel(&self) -> &'static str {
        "feishu"
    }

    fn render(&self, report: &ReportData) -> String {
        render_message(report, &FeishuStyle, &timestamp_label(&beijing_now()))
    }

    fn payload(&self, content: &str, report_type: &str) -> serde_json::Value {
        json!({
            "msg_type": "text",
            "content": {
                "text": content,
                "timestamp": timestamp_label(&beijing_now()),
                "report_type": report_type,
            }
        })
    }

    fn max_bytes(&self) -> usize {
        FEISHU_MAX_BYTES
    }

    fn batch_interval(&self) -> Duration {
        self.webhook.batch_interval()
    }

    async fn deliver(&self, payload: &serde_json::Value) -> Result<()> {
        self.webhook.post(self.channel(), payload).await?;
        Ok(())
    }
}
