//! Database operations for `crawl_runs`, the audit trail of ingest and dedup
//! runs.
//!
//! Lifecycle: `queued -> running -> succeeded | failed`. Every transition is
//! guarded by the expected current status.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, run_type, status, started_at, completed_at, \
     pages_fetched, records_inserted, records_skipped, records_rejected, records_removed, \
     error_message, created_at";

/// A row from the `crawl_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CrawlRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_type: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_fetched: i32,
    pub records_inserted: i32,
    pub records_skipped: i32,
    pub records_rejected: i32,
    pub records_removed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Counters written when a run finishes, successfully or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub pages_fetched: i32,
    pub records_inserted: i32,
    pub records_skipped: i32,
    pub records_rejected: i32,
    pub records_removed: i32,
}

/// Creates a new run in `queued` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_crawl_run(pool: &PgPool, run_type: &str) -> Result<CrawlRunRow, DbError> {
    let row = sqlx::query_as::<_, CrawlRunRow>(&format!(
        "INSERT INTO crawl_runs (public_id, run_type, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(run_type)
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
pub async fn start_crawl_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE crawl_runs \
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

/// Marks a run as `succeeded` and records its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_crawl_run(pool: &PgPool, id: i64, counts: RunCounts) -> Result<(), DbError> {
    finish(pool, id, "succeeded", counts, None).await
}

/// Marks a run as `failed`, recording whatever counters were reached and the
/// error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_crawl_run(
    pool: &PgPool,
    id: i64,
    counts: RunCounts,
    error_message: &str,
) -> Result<(), DbError> {
    finish(pool, id, "failed", counts, Some(error_message)).await
}

async fn finish(
    pool: &PgPool,
    id: i64,
    status: &str,
    counts: RunCounts,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE crawl_runs \
         SET status = $1, completed_at = NOW(), \
             pages_fetched = $2, records_inserted = $3, records_skipped = $4, \
             records_rejected = $5, records_removed = $6, error_message = $7 \
         WHERE id = $8 AND status = 'running'",
    )
    .bind(status)
    .bind(counts.pages_fetched)
    .bind(counts.records_inserted)
    .bind(counts.records_skipped)
    .bind(counts.records_rejected)
    .bind(counts.records_removed)
    .bind(error_message)
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
pub async fn get_crawl_run(pool: &PgPool, id: i64) -> Result<CrawlRunRow, DbError> {
    sqlx::query_as::<_, CrawlRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM crawl_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_crawl_runs(pool: &PgPool, limit: i64) -> Result<Vec<CrawlRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CrawlRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM crawl_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
