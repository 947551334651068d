//! Authenticated Reddit search client for the lead-discovery pipeline.
//!
//! Wraps Reddit's OAuth search API with token refresh, typed candidate
//! parsing, retry with exponential backoff on transient failures, and
//! proactive rate-limit pacing driven by Reddit's quota headers.

pub mod client;
pub mod error;
mod rate_limit;
pub mod types;

pub use client::RedditClient;
pub use error::RedditError;
pub use types::{RedditConfig, RefreshedToken, SortOrder};
