use thiserror::Error;

/// Errors returned by the scoring-service client.
///
/// All variants are candidate-scoped: the pipeline logs them and moves on
/// to the next candidate rather than failing the batch.
#[derive(Debug, Error)]
pub enum ScorerError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The scoring service returned a non-2xx status.
    #[error("scoring service returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into a verdict.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response parsed but carried out-of-range fields.
    #[error("invalid verdict from scoring service: {reason}")]
    InvalidVerdict { reason: String },

    /// The scorer base URL is not parseable.
    #[error("invalid scorer URL: {url}")]
    InvalidUrl { url: String },
}
