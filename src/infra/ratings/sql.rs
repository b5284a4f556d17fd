use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::analyzers::types::EntityKind;
use crate::services::rating_source::{RatingSample, RatingSource};

/// Reads review aggregates from the `reviews` table.
///
/// Each row is one user review: `review_type` is `course` or `professor`,
/// `target_id` is the entity id and `rating` is 1–5.
#[derive(Clone)]
pub struct SqlRatingStore {
    pool: SqlitePool,
}

impl SqlRatingStore {
    /// Opens a pool for `database_url` (e.g. `sqlite://reviews.db`).
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to ratings database {database_url}"))?;

        info!("Connected to ratings database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the `reviews` table and its lookup index if they are missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                review_type TEXT NOT NULL CHECK (review_type IN ('course', 'professor')),
                target_id TEXT NOT NULL,
                rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reviews_target ON reviews (review_type, target_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl RatingSource for SqlRatingStore {
    async fn rating_sample(&self, kind: EntityKind, target_id: &str) -> Result<RatingSample> {
        let (mean_rating, review_count) = sqlx::query_as::<_, (Option<f64>, i64)>(
            r#"
            SELECT ROUND(AVG(rating), 2), COUNT(*)
            FROM reviews
            WHERE review_type = ? AND target_id = ?
            "#,
        )
        .bind(kind.as_str())
        .bind(target_id)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Rating lookup failed for {kind} '{target_id}'"))?;

        Ok(RatingSample {
            mean_rating,
            review_count: u64::try_from(review_count).unwrap_or(0),
        })
    }
}
