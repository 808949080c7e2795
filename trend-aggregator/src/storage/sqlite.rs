use crate::traits::RoundLog;
use crate::types::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};
use trend_core::{RoundEntry, RoundHeadlines, RoundSnapshot};
use uuid::Uuid;

/// Rounds stored in SQLite, one transaction per appended round.
pub struct SqliteRoundLog {
    db: SqlitePool,
}

impl SqliteRoundLog {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(db).await
    }

    /// Wrap an existing pool and make sure the schema exists.
    pub async fn from_pool(db: SqlitePool) -> Result<Self> {
        let log = Self { db };
        log.migrate().await?;
        Ok(log)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rounds (
                id TEXT PRIMARY KEY,
                day TEXT NOT NULL,
                round_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (day, round_id)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS round_platforms (
                round_key TEXT NOT NULL REFERENCES rounds(id),
                position INTEGER NOT NULL,
                platform_id TEXT NOT NULL,
                name TEXT NOT NULL,
                failed INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS round_headlines (
                round_key TEXT NOT NULL REFERENCES rounds(id),
                platform_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                ranks TEXT NOT NULL,
                url TEXT NOT NULL DEFAULT '',
                mobile_url TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        debug!("SQLite round log schema ready");
        Ok(())
    }

    async fn load_round(&self, round_key: &str, round_id: String) -> Result<RoundSnapshot> {
        let mut snapshot = RoundSnapshot::new(round_id);

        let platforms = sqlx::query(
            r#"
            SELECT platform_id, name, failed
            FROM round_platforms
            WHERE round_key = ?
            ORDER BY position
            "#,
        )
        .bind(round_key)
        .fetch_all(&self.db)
        .await?;

        for row in platforms {
            let platform_id: String = row.get("platform_id");
            let name: String = row.get("name");
            let failed: i64 = row.get("failed");

            if failed != 0 {
                snapshot.failed.push(platform_id.clone());
            } else {
                snapshot.headlines.insert(platform_id.clone(), RoundHeadlines::new());
            }
            snapshot.names.insert(platform_id, name);
        }

        let headlines = sqlx::query(
            r#"
            SELECT platform_id, title, ranks, url, mobile_url
            FROM round_headlines
            WHERE round_key = ?
            ORDER BY position
            "#,
        )
        .bind(round_key)
        .fetch_all(&self.db)
        .await?;

        for row in headlines {
            let platform_id: String = row.get("platform_id");
            let ranks: String = row.get("ranks");
            let entry = RoundEntry {
                ranks: serde_json::from_str(&ranks)?,
                url: row.get("url"),
                mobile_url: row.get("mobile_url"),
            };
            snapshot
                .headlines
                .get_or_insert_with(&platform_id, RoundHeadlines::new)
                .insert(row.get::<String, _>("title"), entry);
        }

        Ok(snapshot)
    }
}

#[async_trait]
impl RoundLog for SqliteRoundLog {
    async fn append(&self, day: &str, snapshot: &RoundSnapshot) -> Result<()> {
        let round_key = Uuid::new_v4().to_string();
        let mut tx = self.db.begin().await?;

        // A round id seen again replaces the stored round.
        for table in ["round_headlines", "round_platforms"] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE round_key IN (SELECT id FROM rounds WHERE day = ? AND round_id = ?)"
            ))
            .bind(day)
            .bind(&snapshot.round_id)
            .execute(&mut *tx)
            .await?;
        }
        let replaced = sqlx::query("DELETE FROM rounds WHERE day = ? AND round_id = ?")
            .bind(day)
            .bind(&snapshot.round_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if replaced > 0 {
            debug!("Replacing stored round {} for {}", snapshot.round_id, day);
        }

        sqlx::query(
            r#"
            INSERT INTO rounds (id, day, round_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&round_key)
        .bind(day)
        .bind(&snapshot.round_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let platforms = snapshot
            .headlines
            .keys()
            .map(|id| (id, false))
            .chain(snapshot.failed.iter().map(|id| (id.as_str(), true)));
        for (position, (platform_id, failed)) in platforms.enumerate() {
            let name = snapshot
                .names
                .get(platform_id)
                .map(String::as_str)
                .unwrap_or(platform_id);
            sqlx::query(
                r#"
                INSERT INTO round_platforms (round_key, position, platform_id, name, failed)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&round_key)
            .bind(position as i64)
            .bind(platform_id)
            .bind(name)
            .bind(failed as i64)
            .execute(&mut *tx)
            .await?;
        }

        let mut position: i64 = 0;
        for (platform_id, titles) in snapshot.headlines.iter() {
            for (title, entry) in titles.iter() {
                sqlx::query(
                    r#"
                    INSERT INTO round_headlines (round_key, platform_id, position, title, ranks, url, mobile_url)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&round_key)
                .bind(platform_id)
                .bind(position)
                .bind(title)
                .bind(serde_json::to_string(&entry.ranks)?)
                .bind(&entry.url)
                .bind(&entry.mobile_url)
                .execute(&mut *tx)
                .await?;
                position += 1;
            }
        }

        tx.commit().await?;
        info!(
            "Stored round {} for {} ({} titles)",
            snapshot.round_id,
            day,
            snapshot.title_count()
        );
        Ok(())
    }

    async fn load_day(&self, day: &str) -> Result<Vec<RoundSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT id, round_id
            FROM rounds
            WHERE day = ?
            ORDER BY round_id
            "#,
        )
        .bind(day)
        .fetch_all(&self.db)
        .await?;

        let mut rounds = Vec::with_capacity(rows.len());
        for row in rows {
            let round_key: String = row.get("id");
            let round_id: String = row.get("round_id");
            rounds.push(self.load_round(&round_key, round_id).await?);
        }
        debug!("Loaded {} rounds for {} from SQLite", rounds.len(), day);
        Ok(rounds)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
