//! Background job registration.
//!
//! Builds the engine scheduler once with its real dependencies, then
//! registers two recurring jobs at server startup: the due-jobs tick and
//! the staleness sweep. The handle returned by [`build_scheduler`] must be
//! kept alive for the lifetime of the process — dropping it shuts down
//! both jobs.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use leadscout_core::AppConfig;
use leadscout_engine::{PgStore, SchedulerPolicy};
use leadscout_reddit::{RedditClient, RedditConfig};
use leadscout_scorer::ScorerClient;

/// The fully wired engine scheduler used by the server.
pub type Engine = leadscout_engine::Scheduler<PgStore, RedditClient, ScorerClient>;

const SCORER_USER_AGENT: &str = "leadscout/0.1 (scorer-client)";

/// Wires the engine scheduler to Postgres, Reddit, and the scoring service.
///
/// # Errors
///
/// Returns an error if either HTTP client cannot be constructed or the
/// scorer URL is invalid.
pub fn build_engine(pool: PgPool, config: &AppConfig) -> anyhow::Result<Engine> {
    let communities = match leadscout_core::load_communities(&config.communities_path) {
        Ok(communities) => communities,
        Err(e) => {
            tracing::warn!(
                path = %config.communities_path.display(),
                error = %e,
                "communities file unavailable — using embedded defaults"
            );
            leadscout_core::default_communities()
        }
    };

    let policy = SchedulerPolicy::from_app_config(config, communities);
    let source = RedditClient::new(RedditConfig::from_app_config(config))?;
    let qualifier = ScorerClient::new(
        &config.scorer_url,
        config.scorer_timeout_secs,
        SCORER_USER_AGENT,
    )?;

    Ok(Engine::new(PgStore::new(pool), source, qualifier, policy))
}

/// Builds and starts the background job scheduler.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(engine: Arc<Engine>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_tick_job(&scheduler, Arc::clone(&engine)).await?;
    register_sweep_job(&scheduler, engine).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the due-jobs tick.
///
/// Runs every minute by default (`0 * * * * *`), overridable with
/// `LEADSCOUT_TICK_CRON`. Overlapping ticks are harmless: the engine
/// no-ops locally when a tick is already in flight, and the per-job claim
/// in the database is what actually prevents double execution.
async fn register_tick_job(
    scheduler: &JobScheduler,
    engine: Arc<Engine>,
) -> Result<(), JobSchedulerError> {
    let cron = std::env::var("LEADSCOUT_TICK_CRON").unwrap_or_else(|_| "0 * * * * *".to_string());

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let engine = Arc::clone(&engine);

        Box::pin(async move {
            match engine.process_due_jobs().await {
                Ok(summary) if summary.skipped_overlap => {}
                Ok(summary) => {
                    if summary.due > 0 {
                        tracing::info!(
                            due = summary.due,
                            succeeded = summary.succeeded,
                            failed = summary.failed,
                            new_leads = summary.new_leads,
                            "scheduler: tick finished"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: tick aborted — store unavailable");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered due-jobs tick");
    Ok(())
}

/// Register the staleness sweep.
///
/// Runs every five minutes by default (`30 */5 * * * *`), overridable with
/// `LEADSCOUT_SWEEP_CRON`. Recovers jobs left `active` by crashed workers.
async fn register_sweep_job(
    scheduler: &JobScheduler,
    engine: Arc<Engine>,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("LEADSCOUT_SWEEP_CRON").unwrap_or_else(|_| "30 */5 * * * *".to_string());

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let engine = Arc::clone(&engine);

        Box::pin(async move {
            if let Err(e) = engine.sweep_stale_claims().await {
                tracing::error!(error = %e, "scheduler: staleness sweep failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered staleness sweep");
    Ok(())
}
