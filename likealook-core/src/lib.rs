//! Like-a-Look Core - similar portrait search
//!
//! This crate holds everything behind the Like-a-Look REST facade except the
//! HTTP server itself.
//!
//! # Features
//!
//! - Ephemeral store: short-lived, capacity bounded staging of uploaded images
//! - Resource roots: named image collections served by URL
//! - Metadata index: person, photographer and variant URLs per portrait
//! - Similarity backends: remote facial matcher and a random mock
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use likealook_core::{
//!     Collection, EphemeralConfig, EphemeralStore, MetadataIndex, MockBackend, SimilarityService,
//! };
//!
//! # async fn example() -> likealook_core::Result<()> {
//! let index = Arc::new(MetadataIndex::default());
//! let store = Arc::new(EphemeralStore::new(EphemeralConfig::default()));
//! let service = SimilarityService::new(store, MockBackend::new(index), None);
//!
//! let result = service
//!     .find_similar(Collection::DanerMock, b"...".to_vec(), None, 10)
//!     .await?;
//! println!("{} elements", result.elements.len());
//! # Ok(())
//! # }
//! ```

pub mod ephemeral;
pub mod error;
pub mod matcher;
pub mod metadata;
pub mod resources;
pub mod response;
pub mod service;

pub use ephemeral::{
    Clock, EphemeralConfig, EphemeralStore, ManualClock, SystemClock, EPHEMERALS_DISABLED,
    EPHEMERAL_COLLECTION,
};
pub use error::{LikeALookError, Result};
pub use matcher::{
    Collection, MatchCandidate, MockBackend, RemoteBackend, RemoteConfig, SimilarityBackend,
    SourceImage,
};
pub use metadata::{ImageInfo, ImageVariant, MetadataIndex, MetadataRecord, Person};
pub use resources::{Resource, ResourceRoot, ResourceRoots};
pub use response::{Element, RankedResult, Similar};
pub use service::{CollectionInfo, SimilarityService, DEFAULT_MAX_MATCHES_LIMIT};
