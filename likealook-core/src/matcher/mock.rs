//! Mock similarity backend (`daner_mock`).
//!
//! Picks random portraits from the metadata index. The result has the same
//! shape as a real answer, so clients can be developed without the remote
//! matcher. Not a similarity algorithm.

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument, warn};

use super::parse::MatchCandidate;
use super::{Collection, SimilarityBackend, SourceImage};
use crate::error::{LikeALookError, Result};
use crate::metadata::MetadataIndex;
use crate::response::{assemble_elements, RankedResult};

/// Number of elements in every mock result
pub const MOCK_ELEMENTS: usize = 2;

const TECHNOTE: &str = "Created by mock service: Result is randomly selected";

pub struct MockBackend {
    index: Arc<MetadataIndex>,
    seed: Option<u64>,
}

impl MockBackend {
    pub fn new(index: Arc<MetadataIndex>) -> Self {
        Self { index, seed: None }
    }

    /// Deterministic picks for tests
    pub fn with_seed(index: Arc<MetadataIndex>, seed: u64) -> Self {
        Self {
            index,
            seed: Some(seed),
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[async_trait]
impl SimilarityBackend for MockBackend {
    #[instrument(level = "debug", skip(self, source), fields(source_id = %source.id))]
    async fn find_similar(&self, source: &SourceImage, max_matches: usize) -> Result<RankedResult> {
        let mut ids: Vec<&str> = self.index.all_ids().into_iter().collect();
        if ids.is_empty() {
            warn!("Mock backend has no metadata to pick from");
            return Err(LikeALookError::NoCandidates(
                "the metadata index is empty".to_string(),
            ));
        }

        let mut rng = self.rng();
        ids.shuffle(&mut rng);
        let mut picks = ids.iter().cycle();

        let groups: Vec<Vec<MatchCandidate>> = (0..MOCK_ELEMENTS)
            .map(|_| {
                let mut distance = 0.0;
                (0..max_matches)
                    .filter_map(|_| {
                        distance += rng.gen_range(0.001..1.0);
                        picks.next().map(|id| MatchCandidate::new(*id, distance))
                    })
                    .collect()
            })
            .collect();

        debug!(candidates = ids.len(), "Mock result generated");
        Ok(RankedResult {
            source_id: source.id.clone(),
            source_url: source.url.clone(),
            technote: TECHNOTE.to_string(),
            elements: assemble_elements(groups, &self.index),
        })
    }

    fn collection(&self) -> Collection {
        Collection::DanerMock
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("candidates", &self.index.size())
            .field("seed", &self.seed)
            .finish()
    }
}
