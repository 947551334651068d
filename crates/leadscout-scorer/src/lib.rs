//! Client for the remote relevance-scoring service.
//!
//! The scorer is a black box behind `POST /analyze`: it receives one
//! candidate post plus the product profile and returns a qualification
//! verdict. This crate owns the wire contract and validates responses at
//! the boundary so malformed scorer output surfaces as a typed error
//! instead of a crash or a bogus lead.

pub mod client;
pub mod error;

pub use client::ScorerClient;
pub use error::ScorerError;
