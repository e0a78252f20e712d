//! Database operations for the `video_stats` table.
//!
//! Each row is keyed by the `(platform, video_id, date)` triple; writes go
//! through `ON CONFLICT` so concurrent runs never lose updates to a
//! check-then-write race.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use vidstats_core::{DateRange, Platform, TripleKey, VideoStatRecord};

use crate::DbError;

/// A row from the `video_stats` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VideoStatRow {
    pub id: i64,
    pub platform: String,
    pub video_id: String,
    pub date: NaiveDate,
    /// Metric name to value, stored as JSONB.
    pub metrics: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoStatRow {
    /// Converts the row back into the in-memory record shape.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the stored platform string or metrics
    /// JSON does not match the expected shape.
    pub fn into_record(self) -> Result<VideoStatRecord, DbError> {
        let platform: Platform = self
            .platform
            .parse()
            .map_err(|_| DbError::Decode(format!("unknown platform '{}'", self.platform)))?;
        let metrics = serde_json::from_value(self.metrics)
            .map_err(|e| DbError::Decode(format!("metrics for video {}: {e}", self.video_id)))?;

        Ok(VideoStatRecord {
            platform,
            video_id: self.video_id,
            date: self.date,
            metrics,
            fetched_at: self.fetched_at,
        })
    }
}

const ALL_COLUMNS: &str =
    "id, platform, video_id, date, metrics, fetched_at, created_at, updated_at";

/// Inserts a record, leaving any existing row for the same triple untouched.
///
/// Returns the number of rows written: `1` for a fresh insert, `0` when the
/// triple already existed and the insert was skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_video_stat_if_absent(
    pool: &PgPool,
    record: &VideoStatRecord,
) -> Result<u64, DbError> {
    let metrics = serde_json::to_value(&record.metrics)?;

    let result = sqlx::query(
        "INSERT INTO video_stats (platform, video_id, date, metrics, fetched_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (platform, video_id, date) DO NOTHING",
    )
    .bind(record.platform.as_str())
    .bind(&record.video_id)
    .bind(record.date)
    .bind(metrics)
    .bind(record.fetched_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Inserts a record, replacing any existing row for the same triple.
///
/// Returns the number of rows written (always `1` on success; the conflict
/// branch updates in place).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn overwrite_video_stat(
    pool: &PgPool,
    record: &VideoStatRecord,
) -> Result<u64, DbError> {
    let metrics = serde_json::to_value(&record.metrics)?;

    let result = sqlx::query(
        "INSERT INTO video_stats (platform, video_id, date, metrics, fetched_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (platform, video_id, date) DO UPDATE SET \
             metrics    = EXCLUDED.metrics, \
             fetched_at = EXCLUDED.fetched_at, \
             updated_at = NOW()",
    )
    .bind(record.platform.as_str())
    .bind(&record.video_id)
    .bind(record.date)
    .bind(metrics)
    .bind(record.fetched_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Fetches a single row by its identifying triple.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists for the triple, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_video_stat(
    pool: &PgPool,
    platform: Platform,
    video_id: &str,
    date: NaiveDate,
) -> Result<VideoStatRow, DbError> {
    let row = sqlx::query_as::<_, VideoStatRow>(&format!(
        "SELECT {ALL_COLUMNS} FROM video_stats \
         WHERE platform = $1 AND video_id = $2 AND date = $3",
    ))
    .bind(platform.as_str())
    .bind(video_id)
    .bind(date)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the identifying triples already present for dates within `range`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if a
/// stored platform string is unrecognized.
pub async fn existing_triples(pool: &PgPool, range: &DateRange) -> Result<Vec<TripleKey>, DbError> {
    let rows = sqlx::query_as::<_, (String, String, NaiveDate)>(
        "SELECT platform, video_id, date FROM video_stats \
         WHERE date >= $1 AND date <= $2 \
         ORDER BY date, platform, video_id",
    )
    .bind(range.start())
    .bind(range.end())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(platform, video_id, date)| {
            let platform: Platform = platform
                .parse()
                .map_err(|_| DbError::Decode(format!("unknown platform '{platform}'")))?;
            Ok(TripleKey {
                platform,
                video_id,
                date,
            })
        })
        .collect()
}

/// Returns all rows with dates within `range`, ordered by the triple.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_video_stats(
    pool: &PgPool,
    range: &DateRange,
) -> Result<Vec<VideoStatRow>, DbError> {
    let rows = sqlx::query_as::<_, VideoStatRow>(&format!(
        "SELECT {ALL_COLUMNS} FROM video_stats \
         WHERE date >= $1 AND date <= $2 \
         ORDER BY date, platform, video_id",
    ))
    .bind(range.start())
    .bind(range.end())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts all rows in the table.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_video_stats(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM video_stats")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
