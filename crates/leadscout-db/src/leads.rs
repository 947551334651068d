//! Database operations for the `leads` table.

use chrono::{DateTime, Utc};
use leadscout_core::{Candidate, Verdict};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `leads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeadRow {
    pub id: i64,
    pub public_id: Uuid,
    pub owner_id: Uuid,
    pub product_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub body: String,
    pub source_community: String,
    pub author: String,
    pub score: i64,
    pub comment_count: i64,
    pub url: String,
    /// `new`, `contacted`, or `dismissed`; mutated by the owner, never by
    /// the pipeline.
    pub status: String,
    pub verdict: Json<Verdict>,
    pub created_at: DateTime<Utc>,
}

/// Inserts a qualified lead unless one already exists for the same
/// `(owner_id, product_id, external_id)`.
///
/// `ON CONFLICT DO NOTHING` is the dedup contract: re-discovering a post the
/// pipeline has already surfaced must not overwrite the stored verdict or an
/// owner-made status change. Returns `true` only when a new row was written,
/// so callers can report "N new leads found this run".
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_lead_if_new(
    pool: &PgPool,
    owner_id: Uuid,
    product_id: Uuid,
    candidate: &Candidate,
    verdict: &Verdict,
) -> Result<bool, DbError> {
    let public_id = Uuid::new_v4();

    let result = sqlx::query(
        "INSERT INTO leads \
             (public_id, owner_id, product_id, external_id, title, body, \
              source_community, author, score, comment_count, url, status, verdict) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'new', $12) \
         ON CONFLICT (owner_id, product_id, external_id) DO NOTHING",
    )
    .bind(public_id)
    .bind(owner_id)
    .bind(product_id)
    .bind(&candidate.external_id)
    .bind(&candidate.title)
    .bind(&candidate.body)
    .bind(&candidate.source_community)
    .bind(&candidate.author)
    .bind(candidate.score)
    .bind(candidate.comment_count)
    .bind(&candidate.url)
    .bind(Json(verdict))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns the most recent `limit` leads, newest first, optionally filtered
/// by owner and/or product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_leads(
    pool: &PgPool,
    owner_id: Option<Uuid>,
    product_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<LeadRow>, DbError> {
    let rows = sqlx::query_as::<_, LeadRow>(
        "SELECT id, public_id, owner_id, product_id, external_id, title, body, \
                source_community, author, score, comment_count, url, status, \
                verdict, created_at \
         FROM leads \
         WHERE ($1::uuid IS NULL OR owner_id = $1) \
           AND ($2::uuid IS NULL OR product_id = $2) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $3",
    )
    .bind(owner_id)
    .bind(product_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
