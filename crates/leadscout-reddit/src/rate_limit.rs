//! Retry with exponential back-off, plus proactive quota pacing.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (429, network failures). [`QuotaGate`] tracks Reddit's
//! `x-ratelimit-*` response headers and pauses a batch before it runs the
//! window dry, so we stop sending rather than get rejected.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;

use crate::error::RedditError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`RedditError::RateLimited`] — HTTP 429; Reddit has asked us to back off.
/// - [`RedditError::Http`] — network-level failure (connection reset, timeout).
///
/// **Not retriable (propagated immediately):**
/// - [`RedditError::AuthExpired`] — retrying with a dead token cannot succeed.
/// - [`RedditError::Upstream`] — handled by job-level backoff, not in-call retry.
/// - [`RedditError::Deserialize`] — malformed response; retrying won't fix it.
fn is_retriable(err: &RedditError) -> bool {
    matches!(
        err,
        RedditError::RateLimited { .. } | RedditError::Http(_)
    )
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off before the n-th retry is `backoff_base_ms * 2^(n-1)` ± 25 % jitter,
/// capped at 60 s. When the failed attempt was a 429 with a `Retry-After`
/// hint larger than the computed back-off, the hint wins. Non-retriable
/// errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, RedditError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RedditError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let hinted = match &err {
                    RedditError::RateLimited { retry_after_secs } => {
                        retry_after_secs.saturating_mul(1000)
                    }
                    _ => 0,
                };
                let capped = computed.max(hinted).min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient reddit error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QuotaSnapshot {
    remaining: u32,
    reset_at: Instant,
}

/// Tracks the remaining request quota Reddit reports on every response.
///
/// Shared across all calls on one client; the mutex is only held to copy a
/// small struct in or out.
#[derive(Debug)]
pub(crate) struct QuotaGate {
    floor: u32,
    state: Mutex<Option<QuotaSnapshot>>,
}

impl QuotaGate {
    pub(crate) fn new(floor: u32) -> Self {
        Self {
            floor,
            state: Mutex::new(None),
        }
    }

    /// Records the quota headers from a response, if present.
    pub(crate) fn observe(&self, headers: &HeaderMap) {
        let Some((remaining, reset_secs)) = parse_rate_limit_headers(headers) else {
            return;
        };
        let snapshot = QuotaSnapshot {
            remaining,
            reset_at: Instant::now() + Duration::from_secs(reset_secs),
        };
        if let Ok(mut state) = self.state.lock() {
            *state = Some(snapshot);
        }
    }

    /// Returns how long to pause before the next request, if the window is
    /// nearly exhausted. `None` means full speed ahead.
    pub(crate) fn pause_needed(&self) -> Option<Duration> {
        let snapshot = (*self.state.lock().ok()?)?;
        if snapshot.remaining >= self.floor {
            return None;
        }
        let now = Instant::now();
        if snapshot.reset_at <= now {
            return None;
        }
        Some(snapshot.reset_at - now)
    }

    /// Sleeps until the quota window resets when the remaining budget has
    /// dropped below the floor.
    pub(crate) async fn wait_for_headroom(&self) {
        if let Some(pause) = self.pause_needed() {
            tracing::info!(
                pause_secs = pause.as_secs(),
                "reddit quota nearly exhausted — pausing until window reset"
            );
            tokio::time::sleep(pause).await;
        }
    }
}

/// Parses `x-ratelimit-remaining` (a float string like `"596.0"`) and
/// `x-ratelimit-reset` (whole seconds) from a response.
fn parse_rate_limit_headers(headers: &HeaderMap) -> Option<(u32, u64)> {
    let remaining = headers
        .get("x-ratelimit-remaining")?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()?;
    let reset_secs = headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let remaining = remaining.max(0.0) as u32;
    Some((remaining, reset_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn headers(remaining: &str, reset: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            "x-ratelimit-remaining",
            HeaderValue::from_str(remaining).unwrap(),
        );
        map.insert("x-ratelimit-reset", HeaderValue::from_str(reset).unwrap());
        map
    }

    #[test]
    fn parse_rate_limit_headers_accepts_float_remaining() {
        let parsed = parse_rate_limit_headers(&headers("596.0", "240"));
        assert_eq!(parsed, Some((596, 240)));
    }

    #[test]
    fn parse_rate_limit_headers_missing_header_is_none() {
        assert!(parse_rate_limit_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn quota_gate_allows_when_above_floor() {
        let gate = QuotaGate::new(5);
        gate.observe(&headers("100.0", "600"));
        assert!(gate.pause_needed().is_none());
    }

    #[test]
    fn quota_gate_pauses_when_below_floor() {
        let gate = QuotaGate::new(5);
        gate.observe(&headers("2.0", "30"));
        let pause = gate.pause_needed().expect("expected a pause");
        assert!(pause <= Duration::from_secs(30));
        assert!(pause > Duration::from_secs(25));
    }

    #[test]
    fn quota_gate_unobserved_allows() {
        let gate = QuotaGate::new(5);
        assert!(gate.pause_needed().is_none());
    }

    #[tokio::test]
    async fn retries_on_rate_limited_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(RedditError::RateLimited {
                        retry_after_secs: 0,
                    })
                } else {
                    Ok::<u32, RedditError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_auth_expired() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(RedditError::AuthExpired {
                    reason: "invalid_grant".to_string(),
                })
            }
        })
        .await;
        assert_eq!(
            calls.load(Ordering::SeqCst),
            1,
            "AuthExpired must not be retried"
        );
        assert!(matches!(result, Err(RedditError::AuthExpired { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_upstream_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(RedditError::Upstream {
                    status: 500,
                    url: "https://oauth.reddit.com/r/startups/search".to_string(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RedditError::Upstream { .. })));
    }

    #[tokio::test]
    async fn propagates_last_error_after_exhausting_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(RedditError::RateLimited {
                    retry_after_secs: 0,
                })
            }
        })
        .await;
        // max_retries=2 → 3 total attempts
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(RedditError::RateLimited { .. })));
    }
}
