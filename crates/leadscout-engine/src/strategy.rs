//! Query strategy: turns a product profile into search tasks.
//!
//! Pure and deterministic — same profile in, same plan out, no I/O — so
//! the whole thing is unit-testable without any scheduler machinery.

use std::collections::HashSet;

use leadscout_core::{normalize_community, ProductProfile};

/// One search to run: a community and the query string to send to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTask {
    pub community: String,
    pub query: String,
}

/// Words too generic to be useful ICP keywords.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "are", "was", "have", "has", "from", "they",
    "their", "you", "your", "who", "what", "when", "where", "will", "would", "can", "could",
    "should", "our", "out", "about", "into", "over", "more", "most", "some", "such", "only",
    "also", "very", "just", "than", "then", "them", "these", "those", "its", "been", "were",
    "other", "which", "while", "each", "any", "all", "not", "but", "his", "her", "how", "too",
    "people", "person", "need", "needs", "want", "wants", "like", "small", "looking", "anyone",
    "someone",
];

/// Maximum ICP keywords combined into one query.
const MAX_ICP_KEYWORDS: usize = 4;

/// Builds the search plan for one product.
///
/// Communities come from the profile's `target_communities` (normalized and
/// deduplicated, order preserved), falling back to `default_communities`
/// when the owner configured none. Queries come from the profile's pain
/// points — quoted so multi-word phrases search as phrases — plus one
/// keyword query distilled from the ideal-customer-profile text, capped at
/// `max_queries_per_community`. A profile with nothing usable falls back to
/// searching for the product name itself.
#[must_use]
pub fn build_search_plan(
    profile: &ProductProfile,
    default_communities: &[String],
    max_queries_per_community: usize,
) -> Vec<SearchTask> {
    let communities = plan_communities(profile, default_communities);
    let queries = plan_queries(profile, max_queries_per_community);

    let mut tasks = Vec::with_capacity(communities.len() * queries.len());
    for community in &communities {
        for query in &queries {
            tasks.push(SearchTask {
                community: community.clone(),
                query: query.clone(),
            });
        }
    }
    tasks
}

fn plan_communities(profile: &ProductProfile, defaults: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut communities: Vec<String> = profile
        .target_communities
        .iter()
        .map(|c| normalize_community(c))
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_lowercase()))
        .collect();

    if communities.is_empty() {
        communities = defaults.iter().map(|c| normalize_community(c)).collect();
    }

    communities
}

fn plan_queries(profile: &ProductProfile, max_queries: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut queries = Vec::new();

    for pain in &profile.pain_points {
        let pain = pain.trim();
        if pain.is_empty() {
            continue;
        }
        let query = if pain.contains(' ') {
            format!("\"{pain}\"")
        } else {
            pain.to_string()
        };
        if seen.insert(query.to_lowercase()) {
            queries.push(query);
        }
    }

    if let Some(keywords) = icp_keywords(&profile.ideal_customer_profile) {
        if seen.insert(keywords.to_lowercase()) {
            queries.push(keywords);
        }
    }

    queries.truncate(max_queries.max(1));

    if queries.is_empty() {
        // Nothing usable on the profile; at least look for name drops.
        queries.push(profile.name.clone());
    }

    queries
}

/// Distills the ideal-customer-profile prose into a short keyword query.
///
/// Takes the first few distinct non-stopword tokens of four letters or
/// more, in the order they appear.
fn icp_keywords(icp: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for token in icp.split(|c: char| !c.is_ascii_alphanumeric()) {
        let token = token.to_lowercase();
        if token.len() < 4 || STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if seen.insert(token.clone()) {
            keywords.push(token);
        }
        if keywords.len() == MAX_ICP_KEYWORDS {
            break;
        }
    }

    if keywords.is_empty() {
        None
    } else {
        Some(keywords.join(" "))
    }
}

#[cfg(test)]
#[path = "strategy_test.rs"]
mod tests;
