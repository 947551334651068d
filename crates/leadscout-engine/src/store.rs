//! Postgres-backed implementation of [`JobStore`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use leadscout_core::{Candidate, Credential, ProductProfile, Verdict};
use leadscout_db::{DbError, JobRow};
use leadscout_reddit::RefreshedToken;

use crate::traits::JobStore;

/// Thin adapter from the [`JobStore`] trait onto `leadscout-db`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl JobStore for PgStore {
    async fn due_jobs(&self) -> Result<Vec<JobRow>, DbError> {
        leadscout_db::list_due_jobs(&self.pool).await
    }

    async fn claim(&self, job_id: i64) -> Result<bool, DbError> {
        leadscout_db::claim_job(&self.pool, job_id).await
    }

    async fn complete(&self, job_id: i64, interval_minutes: i32) -> Result<bool, DbError> {
        leadscout_db::complete_job(&self.pool, job_id, interval_minutes).await
    }

    async fn fail_retry(&self, job_id: i64, next_run: DateTime<Utc>) -> Result<bool, DbError> {
        leadscout_db::fail_job_retry(&self.pool, job_id, next_run).await
    }

    async fn fail_terminal(&self, job_id: i64) -> Result<bool, DbError> {
        leadscout_db::fail_job_terminal(&self.pool, job_id).await
    }

    async fn reset_stale(&self, stale_minutes: u32) -> Result<Vec<i64>, DbError> {
        leadscout_db::reset_stale_jobs(&self.pool, stale_minutes).await
    }

    async fn product_profile(&self, product_id: Uuid) -> Result<ProductProfile, DbError> {
        leadscout_db::get_product_profile(&self.pool, product_id).await
    }

    async fn credential(&self, owner_id: Uuid) -> Result<Credential, DbError> {
        leadscout_db::get_credential(&self.pool, owner_id).await
    }

    async fn store_refreshed_token(
        &self,
        owner_id: Uuid,
        observed_access_token: &str,
        token: &RefreshedToken,
    ) -> Result<bool, DbError> {
        leadscout_db::update_access_token(
            &self.pool,
            owner_id,
            observed_access_token,
            &token.access_token,
            token.expires_at,
        )
        .await
    }

    async fn insert_lead_if_new(
        &self,
        owner_id: Uuid,
        product_id: Uuid,
        candidate: &Candidate,
        verdict: &Verdict,
    ) -> Result<bool, DbError> {
        leadscout_db::insert_lead_if_new(&self.pool, owner_id, product_id, candidate, verdict)
            .await
    }
}
