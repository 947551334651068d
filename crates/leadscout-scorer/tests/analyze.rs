//! Integration tests for `ScorerClient::analyze` against a wiremock server.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadscout_core::{Candidate, ProductProfile};
use leadscout_scorer::{ScorerClient, ScorerError};

fn test_client(base_url: &str) -> ScorerClient {
    ScorerClient::new(base_url, 5, "leadscout-test/0.1")
        .expect("client construction should not fail")
}

fn candidate() -> Candidate {
    Candidate {
        external_id: "t3_abc123".to_string(),
        title: "Struggling to track invoices".to_string(),
        body: "We keep losing track of unpaid invoices...".to_string(),
        source_community: "startups".to_string(),
        author: "founder_jane".to_string(),
        score: 42,
        comment_count: 7,
        url: "https://www.reddit.com/r/startups/comments/abc123/struggling/".to_string(),
        created_at: Utc::now(),
    }
}

fn profile() -> ProductProfile {
    ProductProfile {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "InvoiceHound".to_string(),
        features: vec!["automatic payment reminders".to_string()],
        benefits: vec!["get paid faster".to_string()],
        pain_points: vec!["losing track of unpaid invoices".to_string()],
        ideal_customer_profile: "freelancers and small agencies".to_string(),
        target_communities: vec![],
    }
}

#[tokio::test]
async fn analyze_parses_full_verdict() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(body_partial_json(json!({
            "candidate": {"external_id": "t3_abc123"},
            "product": {"name": "InvoiceHound"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "relevance_score": 85,
            "confidence": 0.92,
            "reasons": ["explicitly describes the exact pain point"],
            "sample_reply": "Have you tried automating the reminders?",
            "pain_points_matched": ["losing track of unpaid invoices"],
            "buying_signals": ["actively looking for a tool"]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let verdict = client
        .analyze(&candidate(), &profile())
        .await
        .expect("analyze should succeed");

    assert_eq!(verdict.relevance_score, 85);
    assert!((verdict.confidence - 0.92).abs() < 1e-6);
    assert_eq!(verdict.reasons.len(), 1);
    assert_eq!(verdict.buying_signals, vec!["actively looking for a tool"]);
}

#[tokio::test]
async fn analyze_defaults_optional_lists() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "relevance_score": 40,
            "confidence": 0.5
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let verdict = client.analyze(&candidate(), &profile()).await.unwrap();

    assert_eq!(verdict.relevance_score, 40);
    assert!(verdict.reasons.is_empty());
    assert!(verdict.sample_reply.is_none());
}

#[tokio::test]
async fn analyze_rejects_missing_required_fields() {
    let server = MockServer::start().await;

    // No relevance_score at all — a partial response must not pass.
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "confidence": 0.9
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.analyze(&candidate(), &profile()).await;

    assert!(
        matches!(result, Err(ScorerError::Deserialize { .. })),
        "expected Deserialize, got: {result:?}"
    );
}

#[tokio::test]
async fn analyze_rejects_out_of_range_score() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "relevance_score": 9000,
            "confidence": 0.9
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.analyze(&candidate(), &profile()).await;

    assert!(
        matches!(result, Err(ScorerError::InvalidVerdict { .. })),
        "expected InvalidVerdict, got: {result:?}"
    );
}

#[tokio::test]
async fn analyze_maps_non_2xx_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model overloaded"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.analyze(&candidate(), &profile()).await;

    match result {
        Err(ScorerError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "model overloaded");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn analyze_maps_malformed_body_to_deserialize() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.analyze(&candidate(), &profile()).await;

    assert!(
        matches!(result, Err(ScorerError::Deserialize { .. })),
        "expected Deserialize, got: {result:?}"
    );
}
