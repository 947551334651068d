use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub communities_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,
    pub reddit_request_timeout_secs: u64,
    pub reddit_max_retries: u32,
    pub reddit_retry_backoff_base_ms: u64,
    pub reddit_min_remaining_quota: u32,
    pub scorer_url: String,
    pub scorer_timeout_secs: u64,
    pub sched_max_concurrent_jobs: usize,
    pub sched_retry_ceiling: u32,
    pub sched_stale_claim_timeout_minutes: u32,
    pub sched_relevance_threshold: u8,
    pub sched_search_limit: u32,
    pub sched_max_queries_per_community: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("communities_path", &self.communities_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("reddit_client_id", &self.reddit_client_id)
            .field("reddit_client_secret", &"[redacted]")
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field(
                "reddit_request_timeout_secs",
                &self.reddit_request_timeout_secs,
            )
            .field("reddit_max_retries", &self.reddit_max_retries)
            .field(
                "reddit_retry_backoff_base_ms",
                &self.reddit_retry_backoff_base_ms,
            )
            .field(
                "reddit_min_remaining_quota",
                &self.reddit_min_remaining_quota,
            )
            .field("scorer_url", &self.scorer_url)
            .field("scorer_timeout_secs", &self.scorer_timeout_secs)
            .field("sched_max_concurrent_jobs", &self.sched_max_concurrent_jobs)
            .field("sched_retry_ceiling", &self.sched_retry_ceiling)
            .field(
                "sched_stale_claim_timeout_minutes",
                &self.sched_stale_claim_timeout_minutes,
            )
            .field(
                "sched_relevance_threshold",
                &self.sched_relevance_threshold,
            )
            .field("sched_search_limit", &self.sched_search_limit)
            .field(
                "sched_max_queries_per_community",
                &self.sched_max_queries_per_community,
            )
            .finish()
    }
}
