//! Database operations for the `ingest_runs` table.
//!
//! A run moves `queued -> running -> succeeded | failed`; transition updates
//! are guarded by the current status so a stale caller cannot rewind a run.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `ingest_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IngestRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_written: i32,
    pub records_skipped: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const ALL_COLUMNS: &str = "id, public_id, trigger_source, status, start_date, end_date, \
     started_at, completed_at, records_written, records_skipped, error_message, created_at";

/// Creates a new ingest run in `queued` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_ingest_run(
    pool: &PgPool,
    trigger_source: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<IngestRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, IngestRunRow>(&format!(
        "INSERT INTO ingest_runs (public_id, trigger_source, status, start_date, end_date) \
         VALUES ($1, $2, 'queued', $3, $4) \
         RETURNING {ALL_COLUMNS}",
    ))
    .bind(public_id)
    .bind(trigger_source)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_ingest_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingest_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded`, recording `completed_at` and write counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_ingest_run(
    pool: &PgPool,
    id: i64,
    records_written: i32,
    records_skipped: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingest_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_written = $1, records_skipped = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(records_written)
    .bind(records_skipped)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, recording `completed_at` and the error message.
///
/// Write counts are still recorded so a partially-committed run stays
/// accountable.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_ingest_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
    records_written: i32,
    records_skipped: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingest_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1, \
             records_written = $2, records_skipped = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(error_message)
    .bind(records_written)
    .bind(records_skipped)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_ingest_run(pool: &PgPool, id: i64) -> Result<IngestRunRow, DbError> {
    let row = sqlx::query_as::<_, IngestRunRow>(&format!(
        "SELECT {ALL_COLUMNS} FROM ingest_runs WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ingest_runs(pool: &PgPool, limit: i64) -> Result<Vec<IngestRunRow>, DbError> {
    let rows = sqlx::query_as::<_, IngestRunRow>(&format!(
        "SELECT {ALL_COLUMNS} FROM ingest_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
