//! Append-only user feedback and query log.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::core::config::FeedbackSettings;
use crate::core::errors::RagError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub query: String,
    pub response: String,
    pub rating: i64,
}

/// Inclusive bounds for accepted ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingRange {
    pub min: i64,
    pub max: i64,
}

impl RatingRange {
    pub fn contains(&self, rating: i64) -> bool {
        (self.min..=self.max).contains(&rating)
    }
}

impl From<&FeedbackSettings> for RatingRange {
    fn from(settings: &FeedbackSettings) -> Self {
        Self {
            min: settings.min_rating,
            max: settings.max_rating,
        }
    }
}

impl Default for RatingRange {
    fn default() -> Self {
        Self::from(&FeedbackSettings::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total_queries: i64,
    pub total_feedback: i64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingCount {
    pub rating: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRating {
    /// `YYYY-MM-DD` (UTC)
    pub day: String,
    pub average_rating: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCount {
    pub query: String,
    pub count: i64,
}

#[derive(Clone)]
pub struct FeedbackStore {
    pool: SqlitePool,
    range: RatingRange,
}

impl FeedbackStore {
    pub fn new(pool: SqlitePool, range: RatingRange) -> Self {
        Self { pool, range }
    }

    pub fn rating_range(&self) -> RatingRange {
        self.range
    }

    /// Appends one feedback record. Out-of-range ratings are rejected before
    /// anything is written.
    pub async fn record(&self, feedback: &Feedback) -> Result<(), RagError> {
        if !self.range.contains(feedback.rating) {
            return Err(RagError::Validation(format!(
                "rating {} is outside the allowed range {}..={}",
                feedback.rating, self.range.min, self.range.max
            )));
        }

        sqlx::query(
            "INSERT INTO user_feedback (query, response, rating, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(&feedback.query)
        .bind(&feedback.response)
        .bind(feedback.rating)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(rating = feedback.rating, "feedback recorded");
        Ok(())
    }

    /// Appends an answered query to the usage log.
    pub async fn log_query(&self, query: &str, response: &str) -> Result<(), RagError> {
        sqlx::query("INSERT INTO query_log (query, response, timestamp) VALUES (?, ?, ?)")
            .bind(query)
            .bind(response)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `average_rating` is 0.0 when no feedback exists.
    pub async fn stats(&self) -> Result<FeedbackStats, RagError> {
        let total_queries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM query_log")
            .fetch_one(&self.pool)
            .await?;

        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(AVG(rating), 0.0) AS average FROM user_feedback",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(FeedbackStats {
            total_queries,
            total_feedback: row.try_get("total")?,
            average_rating: row.try_get("average")?,
        })
    }

    pub async fn rating_distribution(&self) -> Result<Vec<RatingCount>, RagError> {
        let rows = sqlx::query(
            "SELECT rating, COUNT(*) AS count FROM user_feedback GROUP BY rating ORDER BY rating",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RatingCount {
                    rating: row.try_get("rating")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    pub async fn daily_average_rating(&self) -> Result<Vec<DailyRating>, RagError> {
        let rows = sqlx::query(
            "SELECT substr(timestamp, 1, 10) AS day, AVG(rating) AS average, COUNT(*) AS count
             FROM user_feedback GROUP BY day ORDER BY day",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DailyRating {
                    day: row.try_get("day")?,
                    average_rating: row.try_get("average")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    /// Most frequently asked queries, ties in alphabetical order.
    pub async fn top_queries(&self, limit: usize) -> Result<Vec<QueryCount>, RagError> {
        let rows = sqlx::query(
            "SELECT query, COUNT(*) AS count FROM query_log
             GROUP BY query ORDER BY count DESC, query ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(QueryCount {
                    query: row.try_get("query")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }
}
