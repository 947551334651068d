use thiserror::Error;

/// Errors returned by the Reddit client.
#[derive(Debug, Error)]
pub enum RedditError {
    /// The access token is expired or revoked and could not be refreshed.
    /// Requires the owner to reconnect; retrying cannot succeed.
    #[error("reddit credential expired or revoked: {reason}")]
    AuthExpired { reason: String },

    /// Reddit signalled throttling (HTTP 429). Callers should back off for
    /// at least `retry_after_secs` before trying again.
    #[error("rate limited by reddit (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other non-2xx response from Reddit.
    #[error("unexpected HTTP status {status} from {url}")]
    Upstream { status: u16, url: String },

    /// A request URL could not be built (bad base URL or community name).
    #[error("invalid reddit URL: {url}")]
    InvalidUrl { url: String },

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
