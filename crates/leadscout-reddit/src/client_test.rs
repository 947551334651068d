use super::*;

use uuid::Uuid;

fn test_config() -> RedditConfig {
    RedditConfig {
        client_id: "test-id".to_string(),
        client_secret: "test-secret".to_string(),
        user_agent: "leadscout-test/0.1".to_string(),
        request_timeout_secs: 5,
        max_retries: 0,
        backoff_base_ms: 0,
        min_remaining_quota: 5,
    }
}

fn test_client() -> RedditClient {
    RedditClient::new(test_config()).expect("client construction should not fail")
}

#[test]
fn search_url_encodes_query() {
    let client = test_client();
    let url = client
        .search_url("startups", "\"invoice tracking\" pain", SortOrder::New, 25)
        .unwrap();
    assert_eq!(url.host_str(), Some("oauth.reddit.com"));
    assert_eq!(url.path(), "/r/startups/search");
    let query = url.query().unwrap();
    assert!(
        query.contains("q=%22invoice+tracking%22+pain")
            || query.contains("q=%22invoice%20tracking%22%20pain"),
        "query should be percent-encoded: {url}"
    );
    assert!(query.contains("restrict_sr=true"));
    assert!(query.contains("sort=new"));
    assert!(query.contains("limit=25"));
}

#[test]
fn with_base_urls_strips_trailing_slash() {
    let client = RedditClient::with_base_urls(
        test_config(),
        "https://auth.example.com///",
        "https://api.example.com",
    )
    .unwrap();
    let url = client
        .search_url("SaaS", "churn", SortOrder::Relevance, 10)
        .unwrap();
    assert!(url.as_str().starts_with("https://api.example.com/r/SaaS/search?"));
}

#[test]
fn with_base_urls_rejects_garbage() {
    let result = RedditClient::with_base_urls(test_config(), "not-a-url", "also-not-a-url");
    assert!(matches!(result, Err(RedditError::InvalidUrl { .. })));
}

#[tokio::test]
async fn ensure_fresh_skips_refresh_for_valid_token() {
    // Base URLs point nowhere routable; a fresh token must not trigger any
    // network call.
    let client = RedditClient::with_base_urls(
        test_config(),
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
    )
    .unwrap();

    let credential = leadscout_core::Credential {
        owner_id: Uuid::new_v4(),
        access_token: "still-good".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    };

    let result = client.ensure_fresh(&credential).await.unwrap();
    assert!(result.is_none(), "fresh token should not be refreshed");
}
