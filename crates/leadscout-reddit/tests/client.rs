//! Integration tests for `RedditClient` against a local wiremock server.
//!
//! Covers the search happy path, every error mapping the client can
//! produce, retry behaviour on 429, and the token-refresh flows.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{basic_auth, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadscout_core::Credential;
use leadscout_reddit::{RedditClient, RedditConfig, RedditError, SortOrder};

fn test_config(max_retries: u32) -> RedditConfig {
    RedditConfig {
        client_id: "test-id".to_string(),
        client_secret: "test-secret".to_string(),
        user_agent: "leadscout-test/0.1".to_string(),
        request_timeout_secs: 5,
        max_retries,
        backoff_base_ms: 0,
        min_remaining_quota: 0,
    }
}

fn client_for(server: &MockServer, max_retries: u32) -> RedditClient {
    RedditClient::with_base_urls(test_config(max_retries), &server.uri(), &server.uri())
        .expect("failed to build test RedditClient")
}

/// A listing with one complete post and one deleted stub that must be dropped.
fn listing_json() -> serde_json::Value {
    json!({
        "kind": "Listing",
        "data": {
            "children": [
                {
                    "kind": "t3",
                    "data": {
                        "name": "t3_abc123",
                        "subreddit": "startups",
                        "author": "founder_jane",
                        "title": "Struggling to track invoices",
                        "selftext": "We keep losing track of unpaid invoices...",
                        "score": 42,
                        "num_comments": 7,
                        "permalink": "/r/startups/comments/abc123/struggling/",
                        "created_utc": 1755000000.0
                    }
                },
                {
                    "kind": "t3",
                    "data": {
                        "name": "t3_gone",
                        "subreddit": "startups",
                        "author": "[deleted]",
                        "selftext": "",
                        "score": 0,
                        "permalink": "/r/startups/comments/gone/x/"
                    }
                }
            ],
            "after": null
        }
    })
}

#[tokio::test]
async fn search_parses_candidates_and_drops_incomplete_posts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/startups/search"))
        .and(query_param("q", "invoice tracking"))
        .and(query_param("restrict_sr", "true"))
        .and(query_param("sort", "relevance"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&listing_json()))
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let candidates = client
        .search("tok", "startups", "invoice tracking", SortOrder::Relevance, 25)
        .await
        .expect("search should succeed");

    assert_eq!(candidates.len(), 1, "incomplete post should be dropped");
    assert_eq!(candidates[0].external_id, "t3_abc123");
    assert_eq!(candidates[0].source_community, "startups");
    assert_eq!(candidates[0].comment_count, 7);
    assert_eq!(
        candidates[0].url,
        "https://www.reddit.com/r/startups/comments/abc123/struggling/"
    );
}

#[tokio::test]
async fn search_maps_401_to_auth_expired() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/startups/search"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let result = client
        .search("dead-token", "startups", "anything", SortOrder::New, 10)
        .await;

    // 401 must not be retried: the mock's expect(1) verifies a single call.
    assert!(
        matches!(result, Err(RedditError::AuthExpired { .. })),
        "expected AuthExpired, got: {result:?}"
    );
}

#[tokio::test]
async fn search_maps_429_to_rate_limited_with_hint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/startups/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let result = client
        .search("tok", "startups", "anything", SortOrder::New, 10)
        .await;

    assert!(
        matches!(
            result,
            Err(RedditError::RateLimited {
                retry_after_secs: 120
            })
        ),
        "expected RateLimited with Retry-After hint, got: {result:?}"
    );
}

#[tokio::test]
async fn search_retries_429_then_succeeds() {
    let server = MockServer::start().await;

    // First attempt is throttled...
    Mock::given(method("GET"))
        .and(path("/r/startups/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // ...subsequent attempts succeed.
    Mock::given(method("GET"))
        .and(path("/r/startups/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&listing_json()))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let candidates = client
        .search("tok", "startups", "anything", SortOrder::New, 10)
        .await
        .expect("search should succeed after retry");

    assert_eq!(candidates.len(), 1);
}

#[tokio::test]
async fn search_maps_5xx_to_upstream_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/startups/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let result = client
        .search("tok", "startups", "anything", SortOrder::New, 10)
        .await;

    assert!(
        matches!(result, Err(RedditError::Upstream { status: 503, .. })),
        "expected Upstream(503), got: {result:?}"
    );
}

#[tokio::test]
async fn search_maps_malformed_body_to_deserialize() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r/startups/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let result = client
        .search("tok", "startups", "anything", SortOrder::New, 10)
        .await;

    assert!(
        matches!(result, Err(RedditError::Deserialize { .. })),
        "expected Deserialize, got: {result:?}"
    );
}

#[tokio::test]
async fn refresh_returns_new_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(basic_auth("test-id", "test-secret"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=my-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "access_token": "fresh-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "scope": "read"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let before = Utc::now();
    let token = client
        .refresh("my-refresh")
        .await
        .expect("refresh should succeed");

    assert_eq!(token.access_token, "fresh-token");
    assert!(
        token.expires_at > before + chrono::Duration::seconds(3500),
        "expiry should be ~an hour out, got {}",
        token.expires_at
    );
}

#[tokio::test]
async fn refresh_maps_invalid_grant_to_auth_expired() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(&json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let result = client.refresh("revoked").await;

    match result {
        Err(RedditError::AuthExpired { reason }) => {
            assert_eq!(reason, "invalid_grant");
        }
        other => panic!("expected AuthExpired(invalid_grant), got: {other:?}"),
    }
}

#[tokio::test]
async fn refresh_maps_5xx_to_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let result = client.refresh("whatever").await;

    assert!(
        matches!(result, Err(RedditError::Upstream { status: 502, .. })),
        "expected Upstream(502), got: {result:?}"
    );
}

#[tokio::test]
async fn ensure_fresh_refreshes_expired_credential() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "access_token": "fresh-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "scope": "read"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let credential = Credential {
        owner_id: Uuid::new_v4(),
        access_token: "expired".to_string(),
        refresh_token: "my-refresh".to_string(),
        expires_at: Utc::now() - chrono::Duration::minutes(5),
    };

    let refreshed = client
        .ensure_fresh(&credential)
        .await
        .expect("refresh should succeed")
        .expect("expired credential should be refreshed");

    assert_eq!(refreshed.access_token, "fresh-token");
}

#[tokio::test]
async fn ensure_fresh_propagates_auth_expired_on_dead_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(&json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let credential = Credential {
        owner_id: Uuid::new_v4(),
        access_token: "expired".to_string(),
        refresh_token: "revoked".to_string(),
        expires_at: Utc::now() - chrono::Duration::minutes(5),
    };

    let result = client.ensure_fresh(&credential).await;
    assert!(
        matches!(result, Err(RedditError::AuthExpired { .. })),
        "expected AuthExpired, got: {result:?}"
    );
}
