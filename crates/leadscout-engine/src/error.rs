use thiserror::Error;
use uuid::Uuid;

use leadscout_db::DbError;
use leadscout_reddit::RedditError;

/// A job-level failure from one pipeline run.
///
/// The scheduler is the error boundary: these never propagate past it.
/// Fatal variants park the job in terminal `error` status immediately;
/// everything else goes through retry with backoff up to the ceiling.
#[derive(Debug, Error)]
pub enum JobError {
    /// The owner's Reddit connection is dead (expired/revoked refresh
    /// token). Retrying cannot succeed until the owner reconnects.
    #[error("reddit connection requires owner action: {0}")]
    AuthExpired(String),

    /// The content source throttled us; retry no sooner than the hint.
    #[error("rate limited by content source (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Any other content-source failure (5xx, network, malformed body).
    #[error("content source error: {0}")]
    Source(RedditError),

    /// Persistence failure during the run.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// The job points at a product profile that no longer exists.
    #[error("product profile {0} does not exist")]
    MissingProfile(Uuid),

    /// The owner has never connected Reddit (or the credential was removed).
    #[error("owner {0} has no reddit credential")]
    MissingCredential(Uuid),
}

impl JobError {
    /// Fatal failures cannot be fixed by waiting; the job is parked in
    /// `error` status without burning through the retry ceiling.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JobError::AuthExpired(_) | JobError::MissingProfile(_) | JobError::MissingCredential(_)
        )
    }

    /// The upstream's minimum-wait hint, when the failure was a throttle.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            JobError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Lifts a content-source error to the job level, promoting the
    /// variants the scheduler treats specially.
    pub(crate) fn from_source(err: RedditError) -> Self {
        match err {
            RedditError::AuthExpired { reason } => JobError::AuthExpired(reason),
            RedditError::RateLimited { retry_after_secs } => {
                JobError::RateLimited { retry_after_secs }
            }
            other => JobError::Source(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_expired_is_fatal() {
        assert!(JobError::AuthExpired("invalid_grant".to_string()).is_fatal());
        assert!(JobError::MissingProfile(Uuid::new_v4()).is_fatal());
        assert!(JobError::MissingCredential(Uuid::new_v4()).is_fatal());
    }

    #[test]
    fn rate_limited_is_retryable_with_hint() {
        let err = JobError::RateLimited {
            retry_after_secs: 90,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.retry_after_secs(), Some(90));
    }

    #[test]
    fn source_errors_promote_to_job_variants() {
        let err = JobError::from_source(RedditError::AuthExpired {
            reason: "invalid_grant".to_string(),
        });
        assert!(matches!(err, JobError::AuthExpired(_)));

        let err = JobError::from_source(RedditError::RateLimited {
            retry_after_secs: 30,
        });
        assert_eq!(err.retry_after_secs(), Some(30));

        let err = JobError::from_source(RedditError::Upstream {
            status: 502,
            url: "https://oauth.reddit.com/r/startups/search".to_string(),
        });
        assert!(matches!(err, JobError::Source(_)));
        assert!(!err.is_fatal());
    }
}
