use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode, Url};

use leadscout_core::{Candidate, Credential};

use crate::error::RedditError;
use crate::rate_limit::{retry_with_backoff, QuotaGate};
use crate::types::{
    Listing, PostData, RedditConfig, RefreshedToken, SortOrder, TokenErrorBody, TokenResponse,
};

const DEFAULT_AUTH_BASE_URL: &str = "https://www.reddit.com/";
const DEFAULT_API_BASE_URL: &str = "https://oauth.reddit.com/";

/// Refresh this many seconds before the token's nominal expiry, so a token
/// that expires mid-batch doesn't start failing requests.
const TOKEN_EXPIRY_SKEW_SECS: i64 = 30;

/// Fallback when a 429 response carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Authenticated client for Reddit's OAuth search API.
///
/// Owns the access-token lifecycle (expiry check + refresh call) and the
/// rate-limit mechanics (quota pacing, 429 retry). Token *persistence* is
/// the caller's job: [`RedditClient::ensure_fresh`] hands back the refreshed
/// token for the caller to store.
///
/// Use [`RedditClient::new`] for production or
/// [`RedditClient::with_base_urls`] to point at a mock server in tests.
pub struct RedditClient {
    http: Client,
    config: RedditConfig,
    auth_base: Url,
    api_base: Url,
    quota: QuotaGate,
}

impl RedditClient {
    /// Creates a new client pointed at the production Reddit endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`RedditError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: RedditConfig) -> Result<Self, RedditError> {
        Self::with_base_urls(config, DEFAULT_AUTH_BASE_URL, DEFAULT_API_BASE_URL)
    }

    /// Creates a new client with custom base URLs (for testing with wiremock).
    ///
    /// `auth_base` hosts the token endpoint (`www.reddit.com` in production);
    /// `api_base` hosts the OAuth API (`oauth.reddit.com`).
    ///
    /// # Errors
    ///
    /// Returns [`RedditError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RedditError::InvalidUrl`] if a base URL
    /// is not parseable.
    pub fn with_base_urls(
        config: RedditConfig,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self, RedditError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;

        let quota = QuotaGate::new(config.min_remaining_quota);

        Ok(Self {
            http,
            auth_base: parse_base_url(auth_base)?,
            api_base: parse_base_url(api_base)?,
            quota,
            config,
        })
    }

    /// Returns a refreshed token when `credential` is expired (or about to
    /// be), or `None` when the stored access token is still usable.
    ///
    /// The caller is responsible for persisting a returned token back to the
    /// credential store.
    ///
    /// # Errors
    ///
    /// - [`RedditError::AuthExpired`] if the refresh token is no longer
    ///   accepted (`invalid_grant`) — the owner must reconnect.
    /// - [`RedditError::Upstream`] on a 5xx from the token endpoint.
    /// - [`RedditError::Http`] on network failure.
    /// - [`RedditError::Deserialize`] if the token response is malformed.
    pub async fn ensure_fresh(
        &self,
        credential: &Credential,
    ) -> Result<Option<RefreshedToken>, RedditError> {
        let refresh_horizon = Utc::now() + chrono::Duration::seconds(TOKEN_EXPIRY_SKEW_SECS);
        if credential.expires_at > refresh_horizon {
            return Ok(None);
        }

        tracing::debug!(owner_id = %credential.owner_id, "access token expired — refreshing");
        self.refresh(&credential.refresh_token).await.map(Some)
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Same as [`RedditClient::ensure_fresh`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, RedditError> {
        let url = join_url(&self.auth_base, "api/v1/access_token")?;

        let response = self
            .http
            .post(url.clone())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();

        if status.is_client_error() {
            // Reddit reports an unusable refresh token as 400/401 with an
            // `error` field. Either way the owner has to reconnect.
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("token endpoint returned {status}"));
            return Err(RedditError::AuthExpired { reason });
        }

        if !status.is_success() {
            return Err(RedditError::Upstream {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| RedditError::Deserialize {
                context: "token refresh response".to_string(),
                source: e,
            })?;

        #[allow(clippy::cast_possible_wrap)]
        let expires_at = Utc::now() + chrono::Duration::seconds(token.expires_in as i64);

        Ok(RefreshedToken {
            access_token: token.access_token,
            expires_at,
        })
    }

    /// Searches one subreddit for posts matching `query`, with automatic
    /// retry on transient errors and proactive quota pacing.
    ///
    /// Candidates are returned in the order Reddit ranks them; entries
    /// missing essential fields (deleted posts, promoted slots) are dropped.
    ///
    /// # Errors
    ///
    /// - [`RedditError::AuthExpired`] — HTTP 401; the access token was rejected.
    /// - [`RedditError::RateLimited`] — HTTP 429 after all retries exhausted.
    /// - [`RedditError::Upstream`] — any other non-2xx status (not retried).
    /// - [`RedditError::Http`] — network failure after all retries exhausted.
    /// - [`RedditError::Deserialize`] — response body does not match the
    ///   listing shape (not retried).
    pub async fn search(
        &self,
        access_token: &str,
        community: &str,
        query: &str,
        sort: SortOrder,
        limit: u32,
    ) -> Result<Vec<Candidate>, RedditError> {
        let url = self.search_url(community, query, sort, limit)?;

        retry_with_backoff(self.config.max_retries, self.config.backoff_base_ms, || {
            let url = url.clone();
            async move {
                self.quota.wait_for_headroom().await;

                let response = self
                    .http
                    .get(url.clone())
                    .bearer_auth(access_token)
                    .send()
                    .await?;

                self.quota.observe(response.headers());
                let status = response.status();

                if status == StatusCode::UNAUTHORIZED {
                    return Err(RedditError::AuthExpired {
                        reason: "search request rejected the access token".to_string(),
                    });
                }

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                    return Err(RedditError::RateLimited { retry_after_secs });
                }

                if !status.is_success() {
                    return Err(RedditError::Upstream {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                let listing: Listing =
                    serde_json::from_str(&body).map_err(|e| RedditError::Deserialize {
                        context: format!("search listing from r/{community}"),
                        source: e,
                    })?;

                Ok(listing
                    .data
                    .children
                    .into_iter()
                    .filter_map(|thing| PostData::into_candidate(thing.data))
                    .collect())
            }
        })
        .await
    }

    /// Builds the search URL for one subreddit with properly encoded
    /// query parameters.
    fn search_url(
        &self,
        community: &str,
        query: &str,
        sort: SortOrder,
        limit: u32,
    ) -> Result<Url, RedditError> {
        let mut url = join_url(&self.api_base, &format!("r/{community}/search"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            pairs.append_pair("restrict_sr", "true");
            pairs.append_pair("sort", sort.as_str());
            pairs.append_pair("limit", &limit.to_string());
            pairs.append_pair("raw_json", "1");
        }
        Ok(url)
    }
}

/// Normalise a base URL: ensure it ends with exactly one slash so joins
/// append to the path rather than replacing the last segment.
fn parse_base_url(base: &str) -> Result<Url, RedditError> {
    let normalised = format!("{}/", base.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|_| RedditError::InvalidUrl {
        url: base.to_string(),
    })
}

fn join_url(base: &Url, path: &str) -> Result<Url, RedditError> {
    base.join(path).map_err(|_| RedditError::InvalidUrl {
        url: format!("{base}{path}"),
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
