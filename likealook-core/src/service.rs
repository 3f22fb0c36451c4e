//! Similarity search flow
//!
//! Stages the uploaded image in the ephemeral store, so the remote matcher
//! can fetch it by URL, and dispatches to the backend of the requested
//! collection.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::ephemeral::EphemeralStore;
use crate::error::{LikeALookError, Result};
use crate::matcher::{Collection, MockBackend, RemoteBackend, SimilarityBackend, SourceImage};
use crate::response::RankedResult;

/// Largest `max_matches` a search accepts unless configured otherwise
pub const DEFAULT_MAX_MATCHES_LIMIT: usize = 100;

/// A similarity collection and whether it can currently be queried
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CollectionInfo {
    pub id: Collection,
    pub description: String,
    pub available: bool,
}

pub struct SimilarityService {
    ephemerals: Arc<EphemeralStore>,
    mock: MockBackend,
    remote: Option<RemoteBackend>,
    max_matches_limit: usize,
}

impl SimilarityService {
    pub fn new(
        ephemerals: Arc<EphemeralStore>,
        mock: MockBackend,
        remote: Option<RemoteBackend>,
    ) -> Self {
        if remote.is_none() {
            warn!("No remote matcher configured, daner_v1 is unavailable");
        }
        Self {
            ephemerals,
            mock,
            remote,
            max_matches_limit: DEFAULT_MAX_MATCHES_LIMIT,
        }
    }

    /// Cap on matches per element; larger requests are rejected.
    pub fn with_max_matches_limit(mut self, limit: usize) -> Self {
        self.max_matches_limit = limit;
        self
    }

    pub fn max_matches_limit(&self) -> usize {
        self.max_matches_limit
    }

    /// The backend answering for `collection`
    pub fn backend(&self, collection: Collection) -> Result<&dyn SimilarityBackend> {
        match collection {
            Collection::DanerMock => Ok(&self.mock),
            Collection::DanerV1 => self
                .remote
                .as_ref()
                .map(|r| r as &dyn SimilarityBackend)
                .ok_or(LikeALookError::BackendNotConfigured(collection)),
        }
    }

    pub fn collections(&self) -> Vec<CollectionInfo> {
        Collection::ALL
            .into_iter()
            .map(|c| CollectionInfo {
                id: c,
                description: c.description().to_string(),
                available: self.backend(c).is_ok(),
            })
            .collect()
    }

    pub fn remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    /// Stage `image` and search `collection` for similar portraits.
    ///
    /// `source_id` names the staged image; a UUID is generated when absent.
    /// `max_matches` above the configured limit is an `InvalidArgument`.
    /// A disabled ephemeral store is not fatal here: backends that need a
    /// source URL report [`LikeALookError::EphemeralsDisabled`] themselves.
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    pub async fn find_similar(
        &self,
        collection: Collection,
        image: Vec<u8>,
        source_id: Option<String>,
        max_matches: usize,
    ) -> Result<RankedResult> {
        if max_matches > self.max_matches_limit {
            return Err(LikeALookError::InvalidArgument(format!(
                "max_matches {max_matches} exceeds the limit of {}",
                self.max_matches_limit
            )));
        }
        let backend = self.backend(collection)?;

        let source = if self.ephemerals.is_enabled() {
            let staged_id = self.ephemerals.put(source_id, image);
            SourceImage {
                url: Some(self.ephemerals.url_for(&staged_id)),
                id: staged_id,
            }
        } else {
            warn!("Ephemeral store disabled, source image is not staged");
            SourceImage {
                id: source_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                url: None,
            }
        };

        let result = backend.find_similar(&source, max_matches).await?;
        info!(
            collection = %collection,
            source_id = %result.source_id,
            elements = result.elements.len(),
            "Similarity search completed"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for SimilarityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityService")
            .field("mock", &self.mock)
            .field("remote", &self.remote)
            .field("max_matches_limit", &self.max_matches_limit)
            .finish()
    }
}
