use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use leadscout_core::{AppConfig, Candidate};

/// Connection settings for the Reddit client.
#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries.
    pub backoff_base_ms: u64,
    /// When Reddit reports fewer remaining requests than this, pause until
    /// the quota window resets instead of firing into a 429.
    pub min_remaining_quota: u32,
}

impl RedditConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            client_id: config.reddit_client_id.clone(),
            client_secret: config.reddit_client_secret.clone(),
            user_agent: config.reddit_user_agent.clone(),
            request_timeout_secs: config.reddit_request_timeout_secs,
            max_retries: config.reddit_max_retries,
            backoff_base_ms: config.reddit_retry_backoff_base_ms,
            min_remaining_quota: config.reddit_min_remaining_quota,
        }
    }
}

/// Search result ordering accepted by Reddit's search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Relevance,
    New,
    Top,
    Comments,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevance",
            SortOrder::New => "new",
            SortOrder::Top => "top",
            SortOrder::Comments => "comments",
        }
    }
}

/// A freshly minted access token from the refresh endpoint.
///
/// The caller persists it back to the credential store.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Reddit OAuth token response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) expires_in: u64,
}

/// Error body returned by the token endpoint, e.g. `{"error": "invalid_grant"}`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorBody {
    pub(crate) error: Option<String>,
}

/// Reddit listing envelope: `{"data": {"children": [{"data": {...}}, ...]}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    pub(crate) children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thing {
    pub(crate) data: PostData,
}

/// Raw post fields as Reddit returns them. Everything is optional at the
/// wire level; [`PostData::into_candidate`] decides what is usable.
#[derive(Debug, Deserialize)]
pub(crate) struct PostData {
    /// Fullname, e.g. `"t3_abc123"`.
    pub(crate) name: Option<String>,
    pub(crate) subreddit: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) selftext: Option<String>,
    pub(crate) score: Option<i64>,
    pub(crate) num_comments: Option<i64>,
    pub(crate) permalink: Option<String>,
    pub(crate) created_utc: Option<f64>,
}

impl PostData {
    /// Converts a raw post into a [`Candidate`], or `None` when the post is
    /// missing the fields the pipeline cannot work without (fullname, title,
    /// permalink). Deleted and promoted entries commonly fail this.
    pub(crate) fn into_candidate(self) -> Option<Candidate> {
        let external_id = self.name?;
        let title = self.title?;
        let permalink = self.permalink?;

        #[allow(clippy::cast_possible_truncation)]
        let created_at = self
            .created_utc
            .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single())
            .unwrap_or_else(Utc::now);

        Some(Candidate {
            external_id,
            title,
            body: self.selftext.unwrap_or_default(),
            source_community: self.subreddit.unwrap_or_default(),
            author: self.author.unwrap_or_else(|| "[deleted]".to_string()),
            score: self.score.unwrap_or(0),
            comment_count: self.num_comments.unwrap_or(0),
            url: format!("https://www.reddit.com{permalink}"),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_post() -> PostData {
        PostData {
            name: Some("t3_abc123".to_string()),
            subreddit: Some("startups".to_string()),
            author: Some("founder_jane".to_string()),
            title: Some("Struggling to track invoices".to_string()),
            selftext: Some("We keep losing track of unpaid invoices...".to_string()),
            score: Some(42),
            num_comments: Some(7),
            permalink: Some("/r/startups/comments/abc123/struggling/".to_string()),
            created_utc: Some(1_755_000_000.0),
        }
    }

    #[test]
    fn into_candidate_maps_all_fields() {
        let candidate = full_post().into_candidate().unwrap();
        assert_eq!(candidate.external_id, "t3_abc123");
        assert_eq!(candidate.source_community, "startups");
        assert_eq!(candidate.score, 42);
        assert_eq!(candidate.comment_count, 7);
        assert_eq!(
            candidate.url,
            "https://www.reddit.com/r/startups/comments/abc123/struggling/"
        );
    }

    #[test]
    fn into_candidate_rejects_missing_fullname() {
        let mut post = full_post();
        post.name = None;
        assert!(post.into_candidate().is_none());
    }

    #[test]
    fn into_candidate_rejects_missing_title() {
        let mut post = full_post();
        post.title = None;
        assert!(post.into_candidate().is_none());
    }

    #[test]
    fn into_candidate_defaults_optional_fields() {
        let mut post = full_post();
        post.selftext = None;
        post.author = None;
        post.score = None;
        let candidate = post.into_candidate().unwrap();
        assert_eq!(candidate.body, "");
        assert_eq!(candidate.author, "[deleted]");
        assert_eq!(candidate.score, 0);
    }

    #[test]
    fn sort_order_as_str() {
        assert_eq!(SortOrder::Relevance.as_str(), "relevance");
        assert_eq!(SortOrder::New.as_str(), "new");
        assert_eq!(SortOrder::default(), SortOrder::Relevance);
    }
}
