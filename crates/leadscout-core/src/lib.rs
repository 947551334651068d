//! Shared configuration and domain types for the leadscout workspace.

use thiserror::Error;

pub mod app_config;
pub mod communities;
mod config;
pub mod domain;

pub use app_config::{AppConfig, Environment};
pub use communities::{default_communities, load_communities, normalize_community};
pub use config::{load_app_config, load_app_config_from_env};
pub use domain::{Candidate, Credential, ProductProfile, Verdict};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read communities file {path}: {source}")]
    CommunitiesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse communities file: {0}")]
    CommunitiesFileParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
