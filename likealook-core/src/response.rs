//! Externally visible similarity results

use serde::Serialize;
use tracing::warn;

use crate::matcher::MatchCandidate;
use crate::metadata::{ImageInfo, MetadataIndex, Person};

/// A ranked and enriched answer to one similarity request
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RankedResult {
    pub source_id: String,
    /// Where the matcher fetched the source image from. Absent when the
    /// image could not be staged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Names the backend that produced the result
    pub technote: String,
    pub elements: Vec<Element>,
}

/// One detected face or region of the source image
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Element {
    pub index: usize,
    pub similars: Vec<Similar>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Similar {
    pub id: String,
    /// Smaller is more similar
    pub distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_creators: Vec<Person>,
}

impl Similar {
    /// Join a candidate with its metadata record. Unknown ids keep only
    /// id and distance.
    pub fn enrich(candidate: MatchCandidate, index: &MetadataIndex) -> Self {
        match index.lookup(&candidate.id) {
            Some(record) => Self {
                id: candidate.id,
                distance: candidate.distance,
                image: Some(record.image.clone()),
                person: Some(record.person.clone()),
                image_creators: record.image_creators.clone(),
            },
            None => {
                warn!(id = %candidate.id, "No metadata for matched image");
                Self {
                    id: candidate.id,
                    distance: candidate.distance,
                    image: None,
                    person: None,
                    image_creators: Vec::new(),
                }
            }
        }
    }
}

/// Number elements in output order and enrich their candidates.
///
/// Candidates must already be ranked.
pub fn assemble_elements(groups: Vec<Vec<MatchCandidate>>, index: &MetadataIndex) -> Vec<Element> {
    groups
        .into_iter()
        .enumerate()
        .map(|(i, candidates)| Element {
            index: i,
            similars: candidates
                .into_iter()
                .map(|c| Similar::enrich(c, index))
                .collect(),
        })
        .collect()
}
