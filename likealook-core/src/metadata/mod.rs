//! Portrait metadata index
//!
//! Read-only lookup from image id to the descriptive record of the portrayed
//! person, the photographers and the URLs of every configured image variant.
//! Built once at startup by [`MetadataIndex::load`] and shared behind an `Arc`.

mod loader;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::resources::ResourceRoots;

pub use loader::{dates_to_str, parse_date, parse_photographer};

/// Close cut faces, exposed as `micro_url`
pub const RES_CLOSE: &str = "faces_close_cut_256";
/// Faces cut with a 70% margin, exposed as `tiny_url`
pub const RES_CUTOUT_70: &str = "faces_70_256";
/// Faces cut with a 90% margin, exposed as `medium_url`. Needed by the web client.
pub const RES_CUTOUT_90: &str = "faces_90_256";
/// Wide faces cut with a 90% margin, exposed as `full_url`
pub const RES_CUTOUT_90_WIDE: &str = "faces_90_1090";
/// Unmodified scans, exposed as `raw_url`
pub const RES_ORIGINAL: &str = "faces_original";

/// A person, either portrayed or behind the camera
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Person {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    /// Normalized as `YYYY-MM-DD`, `YYYY` or `"{a} to {b}"` for ranges
    #[serde(skip_serializing_if = "String::is_empty")]
    pub birthday: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deathday: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub occupation: String,
}

/// The same image in one resource collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImageVariant {
    pub url: String,
    pub group: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImageInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiny_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_url: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creation_date: String,
    /// Provenance link into the digital collections
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data_url: String,
    pub variants: Vec<ImageVariant>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MetadataRecord {
    pub image: ImageInfo,
    pub person: Person,
    pub image_creators: Vec<Person>,
}

/// Image id to record
#[derive(Debug, Default)]
pub struct MetadataIndex {
    records: HashMap<String, MetadataRecord>,
}

impl MetadataIndex {
    /// Build an index from records keyed by their image id.
    /// The first record wins when ids repeat.
    pub fn from_records(records: impl IntoIterator<Item = MetadataRecord>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            map.entry(record.image.id.clone()).or_insert(record);
        }
        Self { records: map }
    }

    /// Load every CSV reachable from `sources`.
    ///
    /// A source is a file or a directory; a directory contributes the `*.csv`
    /// files directly inside it in name order. Unreadable sources and
    /// malformed lines are logged and skipped, so this never fails.
    pub fn load(sources: &[PathBuf], roots: &ResourceRoots) -> Self {
        warn_missing_collections(roots);

        let files = loader::expand_sources(sources);
        if files.is_empty() && !sources.is_empty() {
            warn!(sources = ?sources, "Unable to resolve any metadata CSV files");
        }

        let mut records = HashMap::new();
        for file in &files {
            loader::load_file(file, roots, &mut records);
        }

        info!(
            records = records.len(),
            files = files.len(),
            "Metadata index loaded"
        );
        Self { records }
    }

    pub fn lookup(&self, id: &str) -> Option<&MetadataRecord> {
        self.records.get(id)
    }

    /// All known ids in sorted order
    pub fn all_ids(&self) -> BTreeSet<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn warn_missing_collections(roots: &ResourceRoots) {
    if !roots.has_collection(RES_CUTOUT_90) {
        warn!(
            collection = RES_CUTOUT_90,
            "Configuration degraded: needed resource collection is not defined, medium_url will be empty"
        );
    }
    for wanted in [RES_CLOSE, RES_CUTOUT_70, RES_CUTOUT_90_WIDE, RES_ORIGINAL] {
        if !roots.has_collection(wanted) {
            warn!(collection = wanted, "Wanted resource collection is not defined");
        }
    }
}
