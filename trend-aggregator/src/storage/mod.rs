pub mod sqlite;
pub mod text_log;

pub use sqlite::SqliteRoundLog;
pub use text_log::TextRoundLog;

use crate::config::{AppConfig, StorageBackend};
use crate::traits::RoundLog;
use crate::types::Result;

/// Round log for the configured backend.
pub async fn open_round_log(config: &AppConfig) -> Result<Box<dyn RoundLog>> {
    let log: Box<dyn RoundLog> = match config.storage.backend {
        StorageBackend::Text => Box::new(TextRoundLog::new(&config.report.output_dir)),
        StorageBackend::Sqlite => Box::new(SqliteRoundLog::connect(&config.storage.database_url).await?),
    };
    Ok(log)
}
