//! Domain types shared across the pipeline crates.
//!
//! These are the in-memory shapes that cross crate boundaries: the product
//! profile that drives query generation, the transient candidate posts
//! returned by the content source, the scorer's verdict, and the Reddit
//! credential tuple consumed by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked product, as configured by its owner.
///
/// Read-only from the pipeline's perspective: the scheduler consumes it to
/// build search queries and to give the scorer context, and never writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductProfile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub features: Vec<String>,
    pub benefits: Vec<String>,
    /// Customer pain points the product addresses; the primary source of
    /// search phrases.
    pub pain_points: Vec<String>,
    pub ideal_customer_profile: String,
    /// Subreddits the owner wants monitored. Empty means "use the default
    /// community list".
    pub target_communities: Vec<String>,
}

/// A post returned by the content source, not yet evaluated for relevance.
///
/// Transient: candidates live for the duration of one pipeline run and are
/// only persisted once qualified, as part of a lead row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Source-assigned identifier (the Reddit fullname, e.g. `"t3_abc123"`).
    /// Dedup key for lead persistence.
    pub external_id: String,
    pub title: String,
    /// Self-text body; empty for link posts.
    pub body: String,
    pub source_community: String,
    pub author: String,
    pub score: i64,
    pub comment_count: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Structured qualification verdict for one candidate.
///
/// Produced by the scoring service and validated at the boundary; persisted
/// verbatim (as JSON) alongside the lead it qualified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// 0–100; candidates at or above the configured threshold become leads.
    pub relevance_score: u8,
    /// Scorer's self-reported confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    pub reasons: Vec<String>,
    pub sample_reply: Option<String>,
    pub pain_points_matched: Vec<String>,
    pub buying_signals: Vec<String>,
}

impl Verdict {
    /// Returns `true` if the verdict meets the given relevance threshold.
    #[must_use]
    pub fn passes(&self, threshold: u8) -> bool {
        self.relevance_score >= threshold
    }
}

/// A per-owner Reddit OAuth credential tuple.
///
/// Provisioned by the external OAuth connect flow; the pipeline only reads
/// it and refreshes the access token in place when expired.
#[derive(Debug, Clone)]
pub struct Credential {
    pub owner_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Returns `true` if the access token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(score: u8) -> Verdict {
        Verdict {
            relevance_score: score,
            confidence: 0.9,
            reasons: vec!["mentions budgeting pain".to_string()],
            sample_reply: None,
            pain_points_matched: vec![],
            buying_signals: vec![],
        }
    }

    #[test]
    fn verdict_passes_at_threshold() {
        assert!(verdict(60).passes(60));
    }

    #[test]
    fn verdict_fails_below_threshold() {
        assert!(!verdict(59).passes(60));
    }

    #[test]
    fn verdict_round_trips_through_json() {
        let v = verdict(82);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["relevance_score"], 82);
        let back: Verdict = serde_json::from_value(json).unwrap();
        assert_eq!(back.relevance_score, 82);
        assert_eq!(back.reasons, v.reasons);
    }

    #[test]
    fn credential_expiry_check() {
        let now = Utc::now();
        let cred = Credential {
            owner_id: Uuid::new_v4(),
            access_token: "tok".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: now,
        };
        assert!(cred.is_expired_at(now));
        assert!(!cred.is_expired_at(now - chrono::Duration::seconds(1)));
    }
}
