//! Database operations for the `reddit_credentials` table.
//!
//! Credentials are provisioned by the external OAuth connect flow; the
//! pipeline reads them and writes back refreshed access tokens. The write
//! is conditional on the access token observed at read time, so two workers
//! refreshing the same owner concurrently do not clobber each other — the
//! first writer wins and the loser keeps using its own (equally valid)
//! token for the rest of the run.

use chrono::{DateTime, Utc};
use leadscout_core::Credential;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `reddit_credentials` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub owner_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Credential {
            owner_id: row.owner_id,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: row.expires_at,
        }
    }
}

/// Fetches the Reddit credential for an owner.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the owner has never connected Reddit,
/// or [`DbError::Sqlx`] if the query fails.
pub async fn get_credential(pool: &PgPool, owner_id: Uuid) -> Result<Credential, DbError> {
    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT owner_id, access_token, refresh_token, expires_at, updated_at \
         FROM reddit_credentials \
         WHERE owner_id = $1",
    )
    .bind(owner_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row.into())
}

/// Stores a refreshed access token, conditional on the previously observed one.
///
/// Returns `false` when the row changed underneath us (another worker
/// refreshed first); the caller's token is still usable and nothing needs
/// to be retried.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_access_token(
    pool: &PgPool,
    owner_id: Uuid,
    observed_access_token: &str,
    new_access_token: &str,
    new_expires_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE reddit_credentials \
         SET access_token = $3, expires_at = $4, updated_at = NOW() \
         WHERE owner_id = $1 AND access_token = $2",
    )
    .bind(owner_id)
    .bind(observed_access_token)
    .bind(new_access_token)
    .bind(new_expires_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
