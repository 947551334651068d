//! Dependency seams for the scheduler.
//!
//! The engine never talks to Postgres, Reddit, or the scoring service
//! directly — it goes through these traits, implemented by [`PgStore`],
//! [`RedditClient`], and [`ScorerClient`] in production and by in-memory
//! fakes in the scheduler tests.
//!
//! [`PgStore`]: crate::store::PgStore

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use leadscout_core::{Candidate, Credential, ProductProfile, Verdict};
use leadscout_db::{DbError, JobRow};
use leadscout_reddit::{RedditClient, RedditError, RefreshedToken, SortOrder};
use leadscout_scorer::{ScorerClient, ScorerError};

/// Fetches candidate content and manages the owner's access token.
pub trait ContentSource: Send + Sync {
    /// Returns a refreshed token when the credential is expired, `None`
    /// when it is still usable. The caller persists any returned token.
    fn ensure_fresh(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Option<RefreshedToken>, RedditError>> + Send;

    /// Searches one community for posts matching `query`.
    fn search(
        &self,
        access_token: &str,
        community: &str,
        query: &str,
        sort: SortOrder,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Candidate>, RedditError>> + Send;
}

/// Scores one candidate against one product profile.
pub trait LeadQualifier: Send + Sync {
    fn analyze(
        &self,
        candidate: &Candidate,
        product: &ProductProfile,
    ) -> impl Future<Output = Result<Verdict, ScorerError>> + Send;
}

/// Persistence operations the scheduler and pipeline need.
///
/// Every job-state transition is conditional: the `bool` results report
/// whether the update actually applied, mirroring the CAS-style SQL
/// underneath. The job table is the sole source of execution exclusivity.
pub trait JobStore: Send + Sync {
    /// Jobs that are `idle` with `next_run` in the past.
    fn due_jobs(&self) -> impl Future<Output = Result<Vec<JobRow>, DbError>> + Send;

    /// Atomically claims a job (`idle` → `active`). `false` means the
    /// claim was lost to a concurrent worker.
    fn claim(&self, job_id: i64) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Releases a job after success: `idle`, `next_run = now + interval`,
    /// `retry_count = 0`.
    fn complete(
        &self,
        job_id: i64,
        interval_minutes: i32,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Releases a job after a retryable failure with a caller-computed
    /// backoff `next_run`.
    fn fail_retry(
        &self,
        job_id: i64,
        next_run: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Parks a job in terminal `error` status.
    fn fail_terminal(&self, job_id: i64) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Resets jobs stuck `active` past the staleness timeout; returns the
    /// ids that were reset.
    fn reset_stale(
        &self,
        stale_minutes: u32,
    ) -> impl Future<Output = Result<Vec<i64>, DbError>> + Send;

    fn product_profile(
        &self,
        product_id: Uuid,
    ) -> impl Future<Output = Result<ProductProfile, DbError>> + Send;

    fn credential(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = Result<Credential, DbError>> + Send;

    /// Persists a refreshed access token, conditional on the token observed
    /// at read time. `false` means another worker refreshed first.
    fn store_refreshed_token(
        &self,
        owner_id: Uuid,
        observed_access_token: &str,
        token: &RefreshedToken,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Dedup-safe lead insert; `true` when a new row was written.
    fn insert_lead_if_new(
        &self,
        owner_id: Uuid,
        product_id: Uuid,
        candidate: &Candidate,
        verdict: &Verdict,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;
}

impl ContentSource for RedditClient {
    async fn ensure_fresh(
        &self,
        credential: &Credential,
    ) -> Result<Option<RefreshedToken>, RedditError> {
        RedditClient::ensure_fresh(self, credential).await
    }

    async fn search(
        &self,
        access_token: &str,
        community: &str,
        query: &str,
        sort: SortOrder,
        limit: u32,
    ) -> Result<Vec<Candidate>, RedditError> {
        RedditClient::search(self, access_token, community, query, sort, limit).await
    }
}

impl LeadQualifier for ScorerClient {
    async fn analyze(
        &self,
        candidate: &Candidate,
        product: &ProductProfile,
    ) -> Result<Verdict, ScorerError> {
        ScorerClient::analyze(self, candidate, product).await
    }
}

// Shared stores: lets several schedulers (or a scheduler and an API
// handler) borrow the same backing store.
impl<T: JobStore> JobStore for Arc<T> {
    async fn due_jobs(&self) -> Result<Vec<JobRow>, DbError> {
        (**self).due_jobs().await
    }

    async fn claim(&self, job_id: i64) -> Result<bool, DbError> {
        (**self).claim(job_id).await
    }

    async fn complete(&self, job_id: i64, interval_minutes: i32) -> Result<bool, DbError> {
        (**self).complete(job_id, interval_minutes).await
    }

    async fn fail_retry(&self, job_id: i64, next_run: DateTime<Utc>) -> Result<bool, DbError> {
        (**self).fail_retry(job_id, next_run).await
    }

    async fn fail_terminal(&self, job_id: i64) -> Result<bool, DbError> {
        (**self).fail_terminal(job_id).await
    }

    async fn reset_stale(&self, stale_minutes: u32) -> Result<Vec<i64>, DbError> {
        (**self).reset_stale(stale_minutes).await
    }

    async fn product_profile(&self, product_id: Uuid) -> Result<ProductProfile, DbError> {
        (**self).product_profile(product_id).await
    }

    async fn credential(&self, owner_id: Uuid) -> Result<Credential, DbError> {
        (**self).credential(owner_id).await
    }

    async fn store_refreshed_token(
        &self,
        owner_id: Uuid,
        observed_access_token: &str,
        token: &RefreshedToken,
    ) -> Result<bool, DbError> {
        (**self)
            .store_refreshed_token(owner_id, observed_access_token, token)
            .await
    }

    async fn insert_lead_if_new(
        &self,
        owner_id: Uuid,
        product_id: Uuid,
        candidate: &Candidate,
        verdict: &Verdict,
    ) -> Result<bool, DbError> {
        (**self)
            .insert_lead_if_new(owner_id, product_id, candidate, verdict)
            .await
    }
}
