pub mod types;
pub mod traits;
pub mod utils;
pub mod config;
pub mod fetcher;
pub mod storage;
pub mod report;
pub mod notifiers;
pub mod pipeline;

pub use types::*;
pub use traits::{Notifier, RoundLog};
pub use config::{AppConfig, ConfigValidator, KeywordRules};
pub use fetcher::Fetcher;
pub use storage::{SqliteRoundLog, TextRoundLog};
pub use report::{HtmlReport, ReportData, ReportMode};
pub use pipeline::{RunSummary, TrendPipeline};
