use super::{MessageStyle, WebhookClient, render_message};
use crate::report::{RankMarkup, ReportData};
use crate::traits::Notifier;
use crate::types::{Result, TrendError};
use crate::utils::time::{beijing_now, timestamp_label};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const WEWORK_MAX_BYTES: usize = 20000;

struct WeWorkStyle;

impl RankMarkup for WeWorkStyle {
    fn highlight(&self, range: &str) -> String {
        format!("**{range}**")
    }
}

impl MessageStyle for WeWorkStyle {
    fn bold(&self, text: &str) -> String {
        format!("**{text}**")
    }

    fn link(&self, title: &str, url: &str) -> String {
        format!("[{title}]({url})")
    }

    fn muted(&self, text: &str) -> String {
        format!("<font color=\"comment\">{text}</font>")
    }
}

/// WeCom group robot. Delivery requires `errcode == 0` in the answer.
pub struct WeWorkNotifier {
    webhook: WebhookClient,
}

impl WeWorkNotifier {
    pub fn new(webhook: WebhookClient) -> Self {
        Self { webhook }
    }
}

#[async_trait]
impl Notifier for WeWorkNotifier {
    fn channel(&self) -> &'static str {
        "wework"
    }

    fn render(&self, report: &ReportData) -> String {
        let now = timestamp_label(&beijing_now());
        let header = format!(
            "**总新闻数：** {}\n\n**时间：** {}\n\n**类型：** {}\n\n---\n\n",
            report.total_matched(),
            now,
            report.mode.title()
        );
        header + &render_message(report, &WeWorkStyle, &now)
    }

    fn payload(&self, content: &str, _report_type: &str) -> serde_json::Value {
        json!({
            "msgtype": "markdown",
            "markdown": { "content": content }
        })
    }

    fn max_bytes(&self) -> usize {
        WEWORK_MAX_BYTES
    }

    fn batch_interval(&self) -> Duration {
        self.webhook.batch_interval()
    }

    async fn deliver(&self, payload: &serde_json::Value) -> Result<()> {
        let answer = self.webhook.post(self.channel(), payload).await?;
        match answer.get("errcode").and_then(|code| code.as_i64()) {
            Some(0) => Ok(()),
            code => Err(TrendError::General(format!(
                "wework rejected message: errcode {:?} {}",
                code,
                answer.get("errmsg").and_then(|m| m.as_str()).unwrap_or("")
            ))),
        }
    }
}
