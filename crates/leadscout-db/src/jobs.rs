//! Database operations for the `jobs` table.
//!
//! The jobs table is the single source of truth for execution exclusivity:
//! a job may only be worked on after a conditional claim update flips it
//! from `idle` to `active`, and every subsequent status transition is a
//! conditional update that reports whether it actually applied. Callers
//! never mutate job rows any other way.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `jobs` table.
///
/// `status` holds one of `idle`, `active`, `error`, or `cancelled`
/// (enforced by a CHECK constraint).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: i64,
    pub public_id: Uuid,
    pub owner_id: Uuid,
    pub product_id: Uuid,
    pub job_type: String,
    pub interval_minutes: i32,
    pub status: String,
    pub next_run: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const JOB_COLUMNS: &str = "id, public_id, owner_id, product_id, job_type, interval_minutes, \
     status, next_run, last_run, retry_count, created_at, updated_at";

/// Creates a new monitoring job in `idle` status, due immediately.
///
/// # Errors
///
/// Returns [`DbError::DuplicateJob`] if a job with the same
/// `(owner_id, product_id, job_type)` already exists, or [`DbError::Sqlx`]
/// if the insert fails for any other reason.
pub async fn create_job(
    pool: &PgPool,
    owner_id: Uuid,
    product_id: Uuid,
    job_type: &str,
    interval_minutes: i32,
) -> Result<JobRow, DbError> {
    let public_id = Uuid::new_v4();

    let result = sqlx::query_as::<_, JobRow>(&format!(
        "INSERT INTO jobs (public_id, owner_id, product_id, job_type, interval_minutes, \
                           status, next_run) \
         VALUES ($1, $2, $3, $4, $5, 'idle', NOW()) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(public_id)
    .bind(owner_id)
    .bind(product_id)
    .bind(job_type)
    .bind(interval_minutes)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(db))
            if db.constraint() == Some("jobs_owner_product_type_key") =>
        {
            Err(DbError::DuplicateJob {
                owner_id,
                product_id,
                job_type: job_type.to_owned(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns jobs that are due: `idle` with `next_run` at or before now.
///
/// `error` and `cancelled` jobs are terminal and never due; `active` jobs
/// are already being worked on.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_due_jobs(pool: &PgPool) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} \
         FROM jobs \
         WHERE status = 'idle' AND next_run <= NOW() \
         ORDER BY next_run, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Attempts to claim a job for execution.
///
/// Conditional update: flips the row to `active` and stamps `last_run` only
/// if it is still `idle`. Returns `false` when the claim was lost — another
/// worker got there first, or the job was cancelled between selection and
/// claim. Losing a claim is normal under concurrent ticks, not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_job(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'active', last_run = NOW(), updated_at = NOW() \
         WHERE id = $1 AND status = 'idle'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Releases a claimed job after a successful run.
///
/// Resets `retry_count`, schedules the next run one interval out, and
/// returns the job to `idle`. Returns `false` if the row was no longer
/// `active` (e.g. cancelled mid-run, or reset by the staleness sweep) —
/// in that case the other transition wins and this one is dropped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn complete_job(pool: &PgPool, id: i64, interval_minutes: i32) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'idle', next_run = NOW() + make_interval(mins => $2), \
             retry_count = 0, updated_at = NOW() \
         WHERE id = $1 AND status = 'active'",
    )
    .bind(id)
    .bind(interval_minutes)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Releases a claimed job after a retryable failure.
///
/// Increments `retry_count` and schedules the caller-computed backoff
/// `next_run`. Returns `false` if the row was no longer `active`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_job_retry(
    pool: &PgPool,
    id: i64,
    next_run: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'idle', retry_count = retry_count + 1, next_run = $2, \
             updated_at = NOW() \
         WHERE id = $1 AND status = 'active'",
    )
    .bind(id)
    .bind(next_run)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Moves a claimed job to terminal `error` status.
///
/// Used when the retry ceiling is exceeded or the failure cannot succeed on
/// retry (expired credentials, deleted profile). The job will not run again
/// until its owner intervenes. Returns `false` if the row was no longer
/// `active`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_job_terminal(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'error', retry_count = retry_count + 1, updated_at = NOW() \
         WHERE id = $1 AND status = 'active'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Cancels a job by its public id.
///
/// Cancellation is cooperative: an `active` run finishes its current pass
/// (its release update then loses against the `cancelled` status), and the
/// scheduler never claims cancelled jobs. Returns `false` if the job was
/// already cancelled or does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn cancel_job(pool: &PgPool, public_id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'cancelled', updated_at = NOW() \
         WHERE public_id = $1 AND status != 'cancelled'",
    )
    .bind(public_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Forcibly releases jobs stuck in `active` past the staleness timeout.
///
/// A worker that crashed after claiming leaves its job `active` forever;
/// this sweep resets such rows to `idle`, counts the interrupted run as a
/// failure, and makes them immediately due again. Returns the ids of the
/// jobs that were reset.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn reset_stale_jobs(pool: &PgPool, stale_minutes: u32) -> Result<Vec<i64>, DbError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "UPDATE jobs \
         SET status = 'idle', retry_count = retry_count + 1, next_run = NOW(), \
             updated_at = NOW() \
         WHERE status = 'active' \
           AND last_run IS NOT NULL \
           AND last_run < NOW() - make_interval(mins => $1) \
         RETURNING id",
    )
    .bind(i32::try_from(stale_minutes).unwrap_or(i32::MAX))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Fetches a single job by its public id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such job exists, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_job_by_public_id(pool: &PgPool, public_id: Uuid) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` jobs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_jobs(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} \
         FROM jobs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
