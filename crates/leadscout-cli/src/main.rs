//! Operations CLI: trigger scheduling passes and manage jobs/leads from a
//! shell, against the same database and configuration as the server.

use clap::{Parser, Subcommand};
use uuid::Uuid;

use leadscout_engine::{PgStore, Scheduler, SchedulerPolicy};
use leadscout_reddit::{RedditClient, RedditConfig};
use leadscout_scorer::ScorerClient;

#[derive(Debug, Parser)]
#[command(name = "leadscout-cli")]
#[command(about = "leadscout operations command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one due-jobs scheduling pass and print the summary.
    Tick,
    /// Reset jobs stuck in active state past the staleness timeout.
    Sweep,
    /// Create a monitoring job for a product.
    CreateJob {
        #[arg(long)]
        owner_id: Uuid,
        #[arg(long)]
        product_id: Uuid,
        #[arg(long, default_value = "reddit_discovery")]
        job_type: String,
        #[arg(long, default_value_t = 60)]
        interval_minutes: i32,
    },
    /// Cancel a job by its public id.
    CancelJob {
        job_id: Uuid,
    },
    /// List recent jobs.
    Jobs {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// List recent leads.
    Leads {
        #[arg(long)]
        owner_id: Option<Uuid>,
        #[arg(long)]
        product_id: Option<Uuid>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Tick => {
            let engine = build_engine().await?;
            let summary = engine.process_due_jobs().await?;
            println!(
                "tick: due={} claimed={} succeeded={} failed={} new_leads={}",
                summary.due,
                summary.claimed,
                summary.succeeded,
                summary.failed,
                summary.new_leads
            );
        }
        Commands::Sweep => {
            let engine = build_engine().await?;
            let reset = engine.sweep_stale_claims().await?;
            if reset.is_empty() {
                println!("sweep: no stale claims");
            } else {
                println!("sweep: reset {} stale job(s): {reset:?}", reset.len());
            }
        }
        Commands::CreateJob {
            owner_id,
            product_id,
            job_type,
            interval_minutes,
        } => {
            let pool = leadscout_db::connect_pool_from_env().await?;
            let job = leadscout_db::create_job(
                &pool,
                owner_id,
                product_id,
                &job_type,
                interval_minutes,
            )
            .await?;
            println!(
                "created job {} ({job_type}, every {interval_minutes}m, next run {})",
                job.public_id, job.next_run
            );
        }
        Commands::CancelJob { job_id } => {
            let pool = leadscout_db::connect_pool_from_env().await?;
            if leadscout_db::cancel_job(&pool, job_id).await? {
                println!("cancelled job {job_id}");
            } else {
                println!("job {job_id} does not exist or is already cancelled");
            }
        }
        Commands::Jobs { limit } => {
            let pool = leadscout_db::connect_pool_from_env().await?;
            let jobs = leadscout_db::list_jobs(&pool, limit).await?;
            for job in jobs {
                println!(
                    "{}  {:<10} retry={} next_run={} product={}",
                    job.public_id, job.status, job.retry_count, job.next_run, job.product_id
                );
            }
        }
        Commands::Leads {
            owner_id,
            product_id,
            limit,
        } => {
            let pool = leadscout_db::connect_pool_from_env().await?;
            let leads = leadscout_db::list_leads(&pool, owner_id, product_id, limit).await?;
            for lead in leads {
                println!(
                    "{}  [{}] r/{} score={} {}",
                    lead.public_id,
                    lead.verdict.0.relevance_score,
                    lead.source_community,
                    lead.score,
                    lead.title
                );
            }
        }
    }

    Ok(())
}

/// Wires a full engine scheduler from the environment, the same way the
/// server does at startup.
async fn build_engine() -> anyhow::Result<Scheduler<PgStore, RedditClient, ScorerClient>> {
    let config = leadscout_core::load_app_config_from_env()?;

    let communities = leadscout_core::load_communities(&config.communities_path)
        .unwrap_or_else(|_| leadscout_core::default_communities());

    let pool_config = leadscout_db::PoolConfig::from_app_config(&config);
    let pool = leadscout_db::connect_pool(&config.database_url, pool_config).await?;

    let policy = SchedulerPolicy::from_app_config(&config, communities);
    let source = RedditClient::new(RedditConfig::from_app_config(&config))?;
    let qualifier = ScorerClient::new(
        &config.scorer_url,
        config.scorer_timeout_secs,
        "leadscout/0.1 (scorer-client)",
    )?;

    Ok(Scheduler::new(
        PgStore::new(pool),
        source,
        qualifier,
        policy,
    ))
}
