//! Similarity backends
//!
//! A backend takes a staged source image and returns ranked, enriched
//! matches. Two are provided:
//!
//! - **daner_v1** ([`RemoteBackend`]) - facial similarity computed by a
//!   remote matcher that fetches the source image by URL
//! - **daner_mock** ([`MockBackend`]) - random picks from the metadata
//!   index, for clients and tests that run without the remote matcher

mod mock;
mod parse;
mod remote;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{LikeALookError, Result};
use crate::response::RankedResult;

pub use mock::{MockBackend, MOCK_ELEMENTS};
pub use parse::{excerpt, parse_matches, rank, MatchCandidate, EXCERPT_LIMIT};
pub use remote::{RemoteBackend, RemoteConfig};

/// Similarity collections a caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    DanerMock,
    DanerV1,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::DanerMock, Collection::DanerV1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::DanerMock => "daner_mock",
            Collection::DanerV1 => "daner_v1",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Collection::DanerMock => "Random portraits from the DANER collection (mock service)",
            Collection::DanerV1 => "Facial similarity against the DANER portrait collection",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = LikeALookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daner_mock" => Ok(Collection::DanerMock),
            "daner_v1" => Ok(Collection::DanerV1),
            other => Err(LikeALookError::InvalidArgument(format!(
                "Unknown collection '{other}', expected one of: daner_mock, daner_v1"
            ))),
        }
    }
}

/// The image a similarity search runs for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub id: String,
    /// Absolute URL the remote matcher can fetch the image from.
    /// `None` when the image could not be staged.
    pub url: Option<String>,
}

/// A similarity search implementation.
///
/// Implementations must be thread-safe (`Send + Sync`); a single instance
/// serves all requests.
#[async_trait]
pub trait SimilarityBackend: Send + Sync {
    /// Find at most `max_matches` similar portraits per element of `source`.
    async fn find_similar(&self, source: &SourceImage, max_matches: usize) -> Result<RankedResult>;

    /// The collection this backend answers for.
    fn collection(&self) -> Collection;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
            assert_eq!(collection.to_string(), collection.as_str());
        }
    }

    #[test]
    fn test_unknown_collection() {
        let err = "daner_v2".parse::<Collection>().unwrap_err();
        assert!(matches!(err, LikeALookError::InvalidArgument(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_collection_serializes_as_name() {
        assert_eq!(
            serde_json::to_value(Collection::DanerV1).unwrap(),
            serde_json::json!("daner_v1")
        );
    }
}
