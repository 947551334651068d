use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use leadscout_core::{Candidate, ProductProfile, Verdict};

use crate::error::ScorerError;

/// Request body for `POST /analyze`.
#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    candidate: &'a Candidate,
    product: &'a ProductProfile,
}

/// Loosely-typed verdict as the scoring service returns it.
///
/// Required fields missing from the body fail deserialization; range
/// checks happen in [`RawVerdict::validate`]. List fields default to empty
/// so a partial-but-sane response still yields a usable verdict.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    relevance_score: i64,
    confidence: f64,
    #[serde(default)]
    reasons: Vec<String>,
    #[serde(default)]
    sample_reply: Option<String>,
    #[serde(default)]
    pain_points_matched: Vec<String>,
    #[serde(default)]
    buying_signals: Vec<String>,
}

impl RawVerdict {
    /// Range-checks the raw fields and converts into the shared [`Verdict`].
    fn validate(self) -> Result<Verdict, ScorerError> {
        if !(0..=100).contains(&self.relevance_score) {
            return Err(ScorerError::InvalidVerdict {
                reason: format!(
                    "relevance_score {} outside 0..=100",
                    self.relevance_score
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) || self.confidence.is_nan() {
            return Err(ScorerError::InvalidVerdict {
                reason: format!("confidence {} outside 0.0..=1.0", self.confidence),
            });
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let relevance_score = self.relevance_score as u8;
        #[allow(clippy::cast_possible_truncation)]
        let confidence = self.confidence as f32;

        Ok(Verdict {
            relevance_score,
            confidence,
            reasons: self.reasons,
            sample_reply: self.sample_reply,
            pain_points_matched: self.pain_points_matched,
            buying_signals: self.buying_signals,
        })
    }
}

/// HTTP client for the relevance-scoring service.
///
/// One call per candidate; the service holds no cross-candidate state, so
/// calls are independently retryable by the job-level backoff.
pub struct ScorerClient {
    http: Client,
    base_url: Url,
}

impl ScorerClient {
    /// Creates a client for the scoring service at `base_url`.
    ///
    /// The timeout bounds the whole analyze call — the scorer may sit in
    /// front of a slow model, and a hung scorer must not stall the
    /// pipeline past its own deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ScorerError::InvalidUrl`] if `base_url`
    /// is not a valid URL.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ScorerError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|_| ScorerError::InvalidUrl {
            url: base_url.to_string(),
        })?;

        Ok(Self { http, base_url })
    }

    /// Scores one candidate against one product profile.
    ///
    /// # Errors
    ///
    /// - [`ScorerError::Api`] on a non-2xx response.
    /// - [`ScorerError::Http`] on network failure or timeout.
    /// - [`ScorerError::Deserialize`] if the body is not a verdict.
    /// - [`ScorerError::InvalidVerdict`] if verdict fields are out of range.
    pub async fn analyze(
        &self,
        candidate: &Candidate,
        product: &ProductProfile,
    ) -> Result<Verdict, ScorerError> {
        let url = self
            .base_url
            .join("analyze")
            .map_err(|_| ScorerError::InvalidUrl {
                url: format!("{}analyze", self.base_url),
            })?;

        let response = self
            .http
            .post(url)
            .json(&AnalyzeRequest { candidate, product })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ScorerError::Api {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        let body = response.text().await?;
        let raw: RawVerdict =
            serde_json::from_str(&body).map_err(|e| ScorerError::Deserialize {
                context: format!("verdict for candidate {}", candidate.external_id),
                source: e,
            })?;

        tracing::debug!(
            candidate = %candidate.external_id,
            score = raw.relevance_score,
            "scorer verdict received"
        );

        raw.validate()
    }
}

/// Trims an error body down to something loggable.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(score: i64, confidence: f64) -> RawVerdict {
        RawVerdict {
            relevance_score: score,
            confidence,
            reasons: vec![],
            sample_reply: None,
            pain_points_matched: vec![],
            buying_signals: vec![],
        }
    }

    #[test]
    fn validate_accepts_bounds() {
        assert!(raw(0, 0.0).validate().is_ok());
        assert!(raw(100, 1.0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_score_above_100() {
        let result = raw(150, 0.5).validate();
        assert!(matches!(result, Err(ScorerError::InvalidVerdict { .. })));
    }

    #[test]
    fn validate_rejects_negative_score() {
        let result = raw(-1, 0.5).validate();
        assert!(matches!(result, Err(ScorerError::InvalidVerdict { .. })));
    }

    #[test]
    fn validate_rejects_confidence_above_one() {
        let result = raw(50, 1.5).validate();
        assert!(matches!(result, Err(ScorerError::InvalidVerdict { .. })));
    }

    #[test]
    fn truncate_preserves_short_strings() {
        assert_eq!(truncate("short", 200), "short");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = truncate(s, 2);
        assert!(t.starts_with('h'));
    }
}
