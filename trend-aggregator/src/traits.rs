use crate::notifiers::split_into_batches;
use crate::report::ReportData;
use crate::types::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;
use trend_core::RoundSnapshot;

/// Append-only log of the day's polling rounds.
///
/// The day's state is never stored directly; it is rebuilt by replaying
/// `load_day` through the merger.
#[async_trait]
pub trait RoundLog: Send + Sync {
    /// Persist one round. Appending a round id already stored for `day` replaces it.
    async fn append(&self, day: &str, snapshot: &RoundSnapshot) -> Result<()>;

    /// Every round recorded for `day`, oldest first.
    async fn load_day(&self, day: &str) -> Result<Vec<RoundSnapshot>>;

    /// Human-readable backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Room left in every batch for the `[batch i/n]` prefix.
const BATCH_HEADER_RESERVE: usize = 32;

/// A chat channel that receives the rendered report.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;

    /// Render the report as this channel's message text.
    fn render(&self, report: &ReportData) -> String;

    /// Wrap one batch of message text in the channel's JSON envelope.
    fn payload(&self, content: &str, report_type: &str) -> serde_json::Value;

    /// Largest message body, in UTF-8 bytes, the channel accepts.
    fn max_bytes(&self) -> usize;

    fn batch_interval(&self) -> Duration;

    /// POST one payload and check the channel's acknowledgement.
    async fn deliver(&self, payload: &serde_json::Value) -> Result<()>;

    /// Render, split and deliver the report. Returns the number of batches sent.
    async fn send(&self, report: &ReportData, report_type: &str) -> Result<usize> {
        let content = self.render(report);
        let limit = self.max_bytes().saturating_sub(BATCH_HEADER_RESERVE).max(1);
        let batches = split_into_batches(&content, limit);
        let total = batches.len();

        for (index, batch) in batches.iter().enumerate() {
            let body = if total > 1 {
                format!("[batch {}/{}]\n\n{}", index + 1, total, batch)
            } else {
                batch.clone()
            };
            self.deliver(&self.payload(&body, report_type)).await?;

            if index + 1 < total {
                tokio::time::sleep(self.batch_interval()).await;
            }
        }

        info!("{} notification sent [{}] in {} batch(es)", self.channel(), report_type, total);
        Ok(total)
    }
}
