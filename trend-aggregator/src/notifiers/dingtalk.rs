use super::{MessageStyle, WebhookClient, render_message};
use crate::report::{RankMarkup, ReportData};
use crate::traits::Notifier;
use crate::types::{Result, TrendError};
use crate::utils::time::{beijing_now, timestamp_label};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const DINGTALK_MAX_BYTES: usize = 20000;

struct DingTalkStyle;

impl RankMarkup for DingTalkStyle {
    fn highlight(&self, range: &str) -> String {
        format!("**{range}**")
    }
}

impl MessageStyle for DingTalkStyle {
    fn bold(&self, text: &str) -> String {
        format!("**{text}**")
    }

    fn link(&self, title: &str, url: &str) -> String {
        format!("[{title}]({url})")
    }
}

/// DingTalk custom robot, markdown messages.
pub struct DingTalkNotifier {
    webhook: WebhookClient,
}

impl DingTalkNotifier {
    pub fn new(webhook: WebhookClient) -> Self {
        Self { webhook }
    }
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    fn channel(&self) -> &'static str {
        "dingtalk"
    }

    fn render(&self, report: &ReportData) -> String {
        render_message(report, &DingTalkStyle, &timestamp_label(&beijing_now()))
    }

    fn payload(&self, content: &str, report_type: &str) -> serde_json::Value {
        json!({
            "msgtype": "markdown",
            "markdown": {
                "title": format!("TrendRadar {report_type}"),
                "text": content,
            }
        })
    }

    fn max_bytes(&self) -> usize {
        DINGTALK_MAX_BYTES
    }

    fn batch_interval(&self) -> Duration {
        self.webhook.batch_interval()
    }

    async fn deliver(&self, payload: &serde_json::Value) -> Result<()> {
        let answer = self.webhook.post(self.channel(), payload).await?;
        match answer.get("errcode").and_then(|code| code.as_i64()) {
            None | Some(0) => Ok(()),
            Some(code) => Err(TrendError::General(format!(
                "dingtalk rejected message: errcode {code} {}",
                answer.get("errmsg").and_then(|m| m.as_str()).unwrap_or("")
            ))),
        }
    }
}
