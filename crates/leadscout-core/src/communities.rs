//! Default monitoring communities, loaded from a YAML file.
//!
//! Products that configure no `target_communities` fall back to this list.
//! The file is optional at runtime: callers that cannot read it use the
//! embedded [`default_communities`] set instead.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Built-in fallback used when no communities file is configured.
const EMBEDDED_DEFAULTS: &[&str] = &[
    "startups",
    "Entrepreneur",
    "smallbusiness",
    "SaaS",
    "sidehustle",
];

#[derive(Debug, Deserialize)]
pub struct CommunitiesFile {
    pub communities: Vec<String>,
}

/// Returns the embedded default community list.
#[must_use]
pub fn default_communities() -> Vec<String> {
    EMBEDDED_DEFAULTS.iter().map(|s| (*s).to_string()).collect()
}

/// Normalize a community name: trim whitespace and strip any `r/` or `/r/`
/// prefix users habitually paste in.
#[must_use]
pub fn normalize_community(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("/r/").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("r/").unwrap_or(trimmed);
    trimmed.to_string()
}

/// Load and validate the default-communities configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_communities(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CommunitiesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: CommunitiesFile = serde_yaml::from_str(&content)?;

    let normalized: Vec<String> = file
        .communities
        .iter()
        .map(|c| normalize_community(c))
        .collect();

    validate_communities(&normalized)?;

    Ok(normalized)
}

fn validate_communities(communities: &[String]) -> Result<(), ConfigError> {
    if communities.is_empty() {
        return Err(ConfigError::Validation(
            "communities file must list at least one community".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for name in communities {
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "community name must be non-empty".to_string(),
            ));
        }

        // Subreddit names are alphanumeric plus underscore.
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Validation(format!(
                "invalid community name '{name}'; only letters, digits, and underscores are allowed"
            )));
        }

        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate community: '{name}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "communities_test.rs"]
mod tests;
