//! The per-job discovery pipeline: plan → fetch → score → persist.

use std::collections::HashSet;

use serde::Serialize;

use leadscout_db::{DbError, JobRow};
use leadscout_reddit::SortOrder;

use crate::error::JobError;
use crate::scheduler::SchedulerPolicy;
use crate::strategy::build_search_plan;
use crate::traits::{ContentSource, JobStore, LeadQualifier};

/// What one pipeline run did, for logging and the trigger API.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunStats {
    /// Search requests issued (communities × queries).
    pub searches: usize,
    /// Distinct candidates returned across all searches.
    pub candidates_seen: usize,
    /// Candidates whose verdict met the relevance threshold.
    pub candidates_qualified: usize,
    /// Qualified candidates that were not already stored as leads.
    pub new_leads: usize,
}

/// Runs the full pipeline for one claimed job.
///
/// Strictly sequential within the job: queries are derived from the
/// profile, each planned search runs in turn, and candidates are scored
/// and persisted in the order the source returned them. Scorer failures
/// are candidate-scoped (logged and skipped); search and store failures
/// fail the whole run and surface as a [`JobError`] for the scheduler's
/// retry logic.
pub(crate) async fn run_job<S, C, Q>(
    store: &S,
    source: &C,
    qualifier: &Q,
    policy: &SchedulerPolicy,
    job: &JobRow,
) -> Result<RunStats, JobError>
where
    S: JobStore,
    C: ContentSource,
    Q: LeadQualifier,
{
    let profile = store
        .product_profile(job.product_id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => JobError::MissingProfile(job.product_id),
            other => JobError::Store(other),
        })?;

    let credential = store.credential(job.owner_id).await.map_err(|e| match e {
        DbError::NotFound => JobError::MissingCredential(job.owner_id),
        other => JobError::Store(other),
    })?;

    let mut access_token = credential.access_token.clone();
    if let Some(refreshed) = source
        .ensure_fresh(&credential)
        .await
        .map_err(JobError::from_source)?
    {
        let stored = store
            .store_refreshed_token(job.owner_id, &credential.access_token, &refreshed)
            .await?;
        if !stored {
            tracing::debug!(
                owner_id = %job.owner_id,
                "another worker refreshed this credential first"
            );
        }
        access_token = refreshed.access_token;
    }

    let plan = build_search_plan(
        &profile,
        &policy.default_communities,
        policy.max_queries_per_community,
    );

    let mut stats = RunStats {
        searches: plan.len(),
        ..RunStats::default()
    };

    // The same post routinely matches several queries; dedupe by external
    // id so it is only scored once per run.
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for task in &plan {
        let found = source
            .search(
                &access_token,
                &task.community,
                &task.query,
                SortOrder::default(),
                policy.search_limit,
            )
            .await
            .map_err(JobError::from_source)?;

        for candidate in found {
            if seen.insert(candidate.external_id.clone()) {
                candidates.push(candidate);
            }
        }
    }
    stats.candidates_seen = candidates.len();

    for candidate in &candidates {
        let verdict = match qualifier.analyze(candidate, &profile).await {
            Ok(verdict) => verdict,
            Err(e) => {
                // Fail closed: an unscorable candidate is excluded, the
                // rest of the batch continues.
                tracing::warn!(
                    candidate = %candidate.external_id,
                    error = %e,
                    "scorer failed for candidate — skipping"
                );
                continue;
            }
        };

        if !verdict.passes(policy.relevance_threshold) {
            continue;
        }
        stats.candidates_qualified += 1;

        if store
            .insert_lead_if_new(job.owner_id, job.product_id, candidate, &verdict)
            .await?
        {
            stats.new_leads += 1;
        }
    }

    tracing::info!(
        job_id = job.id,
        product_id = %job.product_id,
        searches = stats.searches,
        candidates = stats.candidates_seen,
        qualified = stats.candidates_qualified,
        new_leads = stats.new_leads,
        "pipeline run complete"
    );

    Ok(stats)
}
