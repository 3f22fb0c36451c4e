//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use likealook_core::{
    Collection, EphemeralStore, MetadataIndex, MockBackend, RemoteBackend, ResourceRoots, Result,
    SimilarityService,
};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Staging, backend selection and search
    pub similarity: Arc<SimilarityService>,
    /// Static and ephemeral resource lookup
    pub resources: Arc<ResourceRoots>,
    /// Portrait metadata, read-only after startup
    pub index: Arc<MetadataIndex>,
    /// Uploaded images, shared with `resources` and `similarity`
    pub ephemerals: Arc<EphemeralStore>,
    /// Collection used when a request names none
    pub default_collection: Collection,
    /// Matches per element when a request gives no limit
    pub default_max_matches: usize,
    /// Largest accepted `max_matches`
    pub max_matches_limit: usize,
    /// Maximum accepted image size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Build every component from configuration.
    ///
    /// Missing roots or metadata only degrade the service; the one hard
    /// failure is an HTTP client that cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let ephemerals = Arc::new(EphemeralStore::new(config.ephemeral_config()));
        let resources = Arc::new(ResourceRoots::new(
            config.resource_roots.clone(),
            config.resource_url_prefix.clone(),
            Arc::clone(&ephemerals),
        ));
        let index = Arc::new(MetadataIndex::load(&config.metadata_csv, &resources));

        let remote = config
            .remote_config()
            .map(|remote| RemoteBackend::new(remote, Arc::clone(&index)))
            .transpose()?;
        let similarity = Arc::new(SimilarityService::new(
            Arc::clone(&ephemerals),
            MockBackend::new(Arc::clone(&index)),
            remote,
        )
        .with_max_matches_limit(config.max_matches_limit));

        Ok(Self {
            similarity,
            resources,
            index,
            ephemerals,
            default_collection: config.default_collection,
            default_max_matches: config.default_max_matches,
            max_matches_limit: config.max_matches_limit,
            max_file_size: config.max_file_size(),
        })
    }
}
