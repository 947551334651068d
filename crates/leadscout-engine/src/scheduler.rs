//! The job scheduler: claims due jobs, drives the pipeline, and owns the
//! retry/backoff and staleness-recovery logic.
//!
//! Exclusivity lives in the job table's conditional claim update, not in
//! this process: any number of scheduler instances may tick concurrently
//! (overlapping cron triggers, multiple replicas) and each job still runs
//! at most once. The in-process `running` flag only spares a single
//! process from piling local ticks on top of each other.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use leadscout_core::AppConfig;
use leadscout_db::{DbError, JobRow};

use crate::error::JobError;
use crate::pipeline::{run_job, RunStats};
use crate::traits::{ContentSource, JobStore, LeadQualifier};

/// Tunable policy knobs, all sourced from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct SchedulerPolicy {
    /// Worker-pool width for one tick.
    pub max_concurrent_jobs: usize,
    /// Retryable failures beyond this count park the job in `error`.
    pub retry_ceiling: u32,
    /// Jobs `active` longer than this are presumed crashed and reset.
    pub stale_claim_timeout_minutes: u32,
    /// Minimum relevance score for a candidate to become a lead.
    pub relevance_threshold: u8,
    /// Per-search result limit passed to the content source.
    pub search_limit: u32,
    /// Cap on distinct queries per community in one run.
    pub max_queries_per_community: usize,
    /// Communities searched for profiles that configure none.
    pub default_communities: Vec<String>,
}

impl SchedulerPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, default_communities: Vec<String>) -> Self {
        Self {
            max_concurrent_jobs: config.sched_max_concurrent_jobs,
            retry_ceiling: config.sched_retry_ceiling,
            stale_claim_timeout_minutes: config.sched_stale_claim_timeout_minutes,
            relevance_threshold: config.sched_relevance_threshold,
            search_limit: config.sched_search_limit,
            max_queries_per_community: config.sched_max_queries_per_community,
            default_communities,
        }
    }
}

/// What one `process_due_jobs` pass did.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TickSummary {
    pub due: usize,
    pub claimed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub new_leads: usize,
    /// `true` when this tick no-opped because another tick was already in
    /// flight in this process.
    pub skipped_overlap: bool,
}

enum JobOutcome {
    /// Another worker claimed the job first; nothing to do.
    ClaimLost,
    Succeeded(RunStats),
    FailedRetry,
    FailedTerminal,
    /// The store itself failed while claiming or releasing.
    StoreFailed,
}

/// Resets the in-flight flag even when a tick errors out early.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The scheduler, generic over its store, content source, and scorer.
pub struct Scheduler<S, C, Q> {
    store: S,
    source: C,
    qualifier: Q,
    policy: SchedulerPolicy,
    running: AtomicBool,
}

impl<S, C, Q> Scheduler<S, C, Q>
where
    S: JobStore,
    C: ContentSource,
    Q: LeadQualifier,
{
    pub fn new(store: S, source: C, qualifier: Q, policy: SchedulerPolicy) -> Self {
        Self {
            store,
            source,
            qualifier,
            policy,
            running: AtomicBool::new(false),
        }
    }

    /// `true` while a tick is executing in this process.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn policy(&self) -> &SchedulerPolicy {
        &self.policy
    }

    /// Runs one scheduling pass: select due jobs, claim each, run the
    /// pipeline, release with success/backoff bookkeeping.
    ///
    /// Due jobs are processed with bounded parallelism
    /// (`policy.max_concurrent_jobs`); no ordering is guaranteed between
    /// them. Job failures are absorbed here and recorded on the job rows —
    /// one tenant's dead credential never affects another's run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] only when the due-job selection itself fails
    /// (store unreachable); that aborts the tick.
    pub async fn process_due_jobs(&self) -> Result<TickSummary, DbError> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("scheduler: tick already in flight — skipping");
            return Ok(TickSummary {
                skipped_overlap: true,
                ..TickSummary::default()
            });
        }
        let _guard = TickGuard(&self.running);

        let due = self.store.due_jobs().await?;
        let mut summary = TickSummary {
            due: due.len(),
            ..TickSummary::default()
        };
        if due.is_empty() {
            return Ok(summary);
        }

        tracing::info!(due = due.len(), "scheduler: processing due jobs");

        let outcomes: Vec<JobOutcome> = stream::iter(due)
            .map(|job| self.run_one(job))
            .buffer_unordered(self.policy.max_concurrent_jobs)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                JobOutcome::ClaimLost => {}
                JobOutcome::Succeeded(stats) => {
                    summary.claimed += 1;
                    summary.succeeded += 1;
                    summary.new_leads += stats.new_leads;
                }
                JobOutcome::FailedRetry | JobOutcome::FailedTerminal => {
                    summary.claimed += 1;
                    summary.failed += 1;
                }
                JobOutcome::StoreFailed => {
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            claimed = summary.claimed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            new_leads = summary.new_leads,
            "scheduler: tick complete"
        );

        Ok(summary)
    }

    /// Claims and runs a single job, absorbing its errors into an outcome.
    async fn run_one(&self, job: JobRow) -> JobOutcome {
        match self.store.claim(job.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    job_id = job.id,
                    "scheduler: claim lost — another worker has this job"
                );
                return JobOutcome::ClaimLost;
            }
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "scheduler: claim failed");
                return JobOutcome::StoreFailed;
            }
        }

        match run_job(&self.store, &self.source, &self.qualifier, &self.policy, &job).await {
            Ok(stats) => {
                match self.store.complete(job.id, job.interval_minutes).await {
                    Ok(true) => {}
                    Ok(false) => {
                        // Cancelled (or swept) while we were running; the
                        // other transition wins.
                        tracing::info!(
                            job_id = job.id,
                            "scheduler: job row changed during run — leaving it as-is"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            job_id = job.id,
                            error = %e,
                            "scheduler: failed to release job after success"
                        );
                        return JobOutcome::StoreFailed;
                    }
                }
                JobOutcome::Succeeded(stats)
            }
            Err(err) => self.handle_failure(&job, &err).await,
        }
    }

    /// Applies the failure policy to a claimed job.
    ///
    /// Fatal errors and exhausted retries park the job in terminal `error`;
    /// everything else reschedules with exponential backoff, never sooner
    /// than the upstream's retry-after hint.
    async fn handle_failure(&self, job: &JobRow, err: &JobError) -> JobOutcome {
        let attempt = u32::try_from(job.retry_count.max(0))
            .unwrap_or(u32::MAX)
            .saturating_add(1);

        if err.is_fatal() || attempt > self.policy.retry_ceiling {
            tracing::warn!(
                job_id = job.id,
                attempt,
                error = %err,
                "scheduler: job failed terminally — owner action required"
            );
            return match self.store.fail_terminal(job.id).await {
                Ok(_) => JobOutcome::FailedTerminal,
                Err(e) => {
                    tracing::error!(job_id = job.id, error = %e, "scheduler: failed to park job");
                    JobOutcome::StoreFailed
                }
            };
        }

        let interval_minutes = u64::try_from(job.interval_minutes.max(1)).unwrap_or(1);
        let backoff_minutes = 2u64.saturating_pow(attempt.min(20)).min(interval_minutes);
        let mut delay_secs = backoff_minutes * 60;
        if let Some(hint) = err.retry_after_secs() {
            delay_secs = delay_secs.max(hint);
        }
        let next_run = Utc::now() + Duration::seconds(i64::try_from(delay_secs).unwrap_or(0));

        tracing::warn!(
            job_id = job.id,
            attempt,
            delay_secs,
            error = %err,
            "scheduler: job failed — retrying with backoff"
        );

        match self.store.fail_retry(job.id, next_run).await {
            Ok(_) => JobOutcome::FailedRetry,
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "scheduler: failed to reschedule job");
                JobOutcome::StoreFailed
            }
        }
    }

    /// Recovers jobs left `active` by a crashed worker.
    ///
    /// Without this, a crash between claim and release would starve a job
    /// forever. Runs on its own timer, independent of the main tick.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the reset update fails.
    pub async fn sweep_stale_claims(&self) -> Result<Vec<i64>, DbError> {
        let reset = self
            .store
            .reset_stale(self.policy.stale_claim_timeout_minutes)
            .await?;

        if reset.is_empty() {
            tracing::debug!("scheduler: sweep found no stale claims");
        } else {
            tracing::warn!(
                jobs = ?reset,
                "scheduler: forcibly released jobs stuck in active state"
            );
        }

        Ok(reset)
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
