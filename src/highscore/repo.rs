//! SQLite-backed high-score repository.
//!
//! One table, one write path, one ranked query. Ranking leans on the
//! composite sort key (`HighScore::sort_key`) so the ORDER BY is a
//! plain descending index scan.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::HighScore;

/// How many entries the leaderboard query returns.
const LEADERBOARD_LIMIT: i64 = 100;

/// What a successful save hands back to the caller.
#[derive(Debug, Clone)]
pub struct SavedHighScore {
    pub id: String,
    pub date: DateTime<Utc>,
}

/// High-score persistence over a SQLite pool.
pub struct HighScoreRepo {
    pool: SqlitePool,
    /// All scores are kept per asset symbol.
    symbol: String,
}

impl HighScoreRepo {
    /// Create the repository, ensuring the schema exists.
    pub async fn new(pool: SqlitePool, symbol: impl Into<String>) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS high_scores (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                score INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                sort_key TEXT NOT NULL,
                date TEXT NOT NULL,
                serialized_history TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("Failed to create high_scores table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_high_scores_rank ON high_scores (symbol, sort_key)",
        )
        .execute(&pool)
        .await
        .context("Failed to create high_scores index")?;

        Ok(HighScoreRepo {
            pool,
            symbol: symbol.into(),
        })
    }

    /// Persist a high score, assigning it a fresh id.
    pub async fn save(&self, high_score: &HighScore) -> Result<SavedHighScore> {
        let id = high_score
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        sqlx::query(
            r#"
            INSERT INTO high_scores (id, username, score, symbol, sort_key, date, serialized_history)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&high_score.username)
        .bind(high_score.score)
        .bind(&self.symbol)
        .bind(high_score.sort_key())
        .bind(high_score.date.to_rfc3339())
        .bind(high_score.serialized_history())
        .execute(&self.pool)
        .await
        .context("Failed to save high score")?;

        debug!(id = %id, username = %high_score.username, score = high_score.score, "High score saved");

        Ok(SavedHighScore {
            id,
            date: high_score.date,
        })
    }

    /// The leaderboard for the configured symbol: highest score first,
    /// most recent first among equals.
    pub async fn list(&self) -> Result<Vec<HighScore>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, date, serialized_history
            FROM high_scores
            WHERE symbol = ?
            ORDER BY sort_key DESC
            LIMIT ?
            "#,
        )
        .bind(&self.symbol)
        .bind(LEADERBOARD_LIMIT)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch high scores")?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let username: String = row.get("username");
                let date_str: String = row.get("date");
                let serialized: String = row.get("serialized_history");

                let date = DateTime::parse_from_rfc3339(&date_str)
                    .map(|d| d.with_timezone(&Utc))
                    .context(format!("Malformed date in high_scores row {id}"))?;

                HighScore::from_serialized(serialized, username, Some(date), Some(id))
                    .map_err(Into::into)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
