//! Remote matcher responses
//!
//! Two shapes are accepted, tried in this order:
//!
//! ```text
//! (a) {"portraits": [{"id": "DP001", "distance": 0.31}, ...]}
//! (b) [[{"id": "DP001", "distance": 0.31}, ...], [...]]
//! ```
//!
//! Shape (a) yields a single element, shape (b) one element per inner list.
//! Anything else fails closed.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{LikeALookError, Result};

/// Maximum length of a response excerpt carried in errors
pub const EXCERPT_LIMIT: usize = 400;

const ELLIPSIS: &str = "...";

/// One upstream match before enrichment.
///
/// Ordered by distance ascending (smaller is more similar), then by id.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchCandidate {
    pub id: String,
    pub distance: f64,
}

impl MatchCandidate {
    pub fn new(id: impl Into<String>, distance: f64) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }
}

impl Ord for MatchCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for MatchCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MatchCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MatchCandidate {}

#[derive(Deserialize)]
#[serde(untagged)]
enum UpstreamMatches {
    Single { portraits: Vec<Value> },
    Multi(Vec<Vec<Value>>),
}

/// Parse a remote matcher body into one candidate list per element.
///
/// Entries without a string `id` or a numeric `distance` are skipped.
pub fn parse_matches(body: &str) -> Result<Vec<Vec<MatchCandidate>>> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        LikeALookError::InvalidUpstreamResponse {
            reason: format!("malformed JSON: {e}"),
            excerpt: excerpt(body),
        }
    })?;

    let matches: UpstreamMatches =
        serde_json::from_value(value).map_err(|_| LikeALookError::InvalidUpstreamResponse {
            reason: "expected {\"portraits\": [...]} or [[...], ...]".to_string(),
            excerpt: excerpt(body),
        })?;

    let groups = match matches {
        UpstreamMatches::Single { portraits } => vec![portraits],
        UpstreamMatches::Multi(groups) => groups,
    };

    Ok(groups
        .into_iter()
        .enumerate()
        .map(|(element, entries)| {
            entries
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<MatchCandidate>(entry.clone()) {
                    Ok(candidate) => Some(candidate),
                    Err(e) => {
                        warn!(element, entry = %entry, error = %e, "Skipping malformed match entry");
                        None
                    }
                })
                .collect()
        })
        .collect())
}

/// Sort, drop repeated ids keeping the best-ranked, and truncate to `max_matches`.
pub fn rank(mut candidates: Vec<MatchCandidate>, max_matches: usize) -> Vec<MatchCandidate> {
    candidates.sort();
    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.id.clone()));
    candidates.truncate(max_matches);
    candidates
}

/// At most [`EXCERPT_LIMIT`] characters of `body`
pub fn excerpt(body: &str) -> String {
    if body.chars().count() <= EXCERPT_LIMIT {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(EXCERPT_LIMIT - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}
