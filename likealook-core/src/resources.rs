//! Named resource collections
//!
//! A collection is either a configured filesystem root or the reserved
//! [`EPHEMERAL_COLLECTION`], which is backed by the [`EphemeralStore`].
//! Only files directly below a root are served: ids carrying path
//! separators or `..` are rejected.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ephemeral::{EphemeralStore, EPHEMERAL_COLLECTION};
use crate::error::{LikeALookError, Result};

/// Default prefix for resource URLs, matching the server's default bind address
pub const DEFAULT_URL_PREFIX: &str = "http://127.0.0.1:3000/resource/";

/// Join `path` onto `prefix` with exactly one `/` between them.
pub fn join_url(prefix: &str, path: &str) -> String {
    if prefix.ends_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

/// A filesystem collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoot {
    pub name: String,
    pub path: PathBuf,
    pub description: String,
}

impl ResourceRoot {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            path: path.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Resolved resource content
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

/// Lookup of static and ephemeral resources by collection and id
pub struct ResourceRoots {
    roots: Vec<ResourceRoot>,
    url_prefix: String,
    ephemerals: Arc<EphemeralStore>,
}

impl ResourceRoots {
    /// Roots are searched in the given order for unqualified lookups.
    /// Missing directories are logged, not rejected.
    pub fn new(
        roots: Vec<ResourceRoot>,
        url_prefix: impl Into<String>,
        ephemerals: Arc<EphemeralStore>,
    ) -> Self {
        let mut accepted: Vec<ResourceRoot> = Vec::with_capacity(roots.len());
        for root in roots {
            if root.name == EPHEMERAL_COLLECTION {
                warn!(path = %root.path.display(), "The collection name 'ephemeral' is reserved, ignoring root");
                continue;
            }
            if accepted.iter().any(|r| r.name == root.name) {
                warn!(name = %root.name, "Duplicate resource root, keeping the first definition");
                continue;
            }
            if !root.path.exists() {
                warn!(name = %root.name, path = %root.path.display(), "Resource root does not exist");
            }
            accepted.push(root);
        }

        info!(roots = accepted.len(), "Resource roots configured");
        Self {
            roots: accepted,
            url_prefix: url_prefix.into(),
            ephemerals,
        }
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.root(name).is_some()
    }

    /// Names of the filesystem collections in configuration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(|r| r.name.as_str())
    }

    pub fn roots(&self) -> &[ResourceRoot] {
        &self.roots
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.root(name).map(|r| r.description.as_str())
    }

    pub fn url_for(&self, collection: &str, id: &str) -> String {
        join_url(&self.url_prefix, &format!("{collection}/{id}"))
    }

    pub fn ephemerals(&self) -> &EphemeralStore {
        &self.ephemerals
    }

    /// Fetch `id` from `collection`.
    pub async fn resolve(&self, collection: &str, id: &str) -> Result<Resource> {
        validate_resource_id(id)?;

        if collection == EPHEMERAL_COLLECTION {
            let data = self.ephemerals.get(id)?;
            return Ok(Resource {
                data: data.to_vec(),
                content_type: content_type_for(id),
            });
        }

        let root = self.root(collection).ok_or_else(|| {
            LikeALookError::NotFound(format!(
                "Non-defined collection '{collection}' for lookup of '{id}'"
            ))
        })?;

        let file = root.path.join(id);
        match tokio::fs::read(&file).await {
            Ok(data) => {
                debug!(collection = %collection, id = %id, bytes = data.len(), "Resource resolved");
                Ok(Resource {
                    data,
                    content_type: content_type_for(id),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LikeALookError::NotFound(
                format!("Unable to resolve resource '{collection}/{id}'"),
            )),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Failed to read resource");
                Err(LikeALookError::Io(e))
            }
        }
    }

    /// Fetch an id that may or may not carry a `collection/` qualifier.
    ///
    /// Unqualified ids are looked up in the ephemeral store first, then in
    /// every root in configuration order.
    pub async fn resolve_unqualified(&self, id: &str) -> Result<Resource> {
        if id.is_empty() {
            return Err(LikeALookError::InvalidArgument(
                "Resource id must not be empty".to_string(),
            ));
        }

        let mut tokens = id.split('/');
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(collection), Some(resource), None) => {
                return self.resolve(collection, resource).await;
            }
            (_, _, Some(_)) => {
                return Err(LikeALookError::InvalidArgument(format!(
                    "ID '{id}' contains more than 1 slash (/)"
                )));
            }
            _ => {}
        }

        validate_resource_id(id)?;
        if let Ok(data) = self.ephemerals.get(id) {
            return Ok(Resource {
                data: data.to_vec(),
                content_type: content_type_for(id),
            });
        }

        for root in &self.roots {
            match self.resolve(&root.name, id).await {
                Ok(resource) => return Ok(resource),
                Err(LikeALookError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(LikeALookError::NotFound(format!(
            "Unable to locate '{id}' in any resource collection"
        )))
    }

    fn root(&self, name: &str) -> Option<&ResourceRoot> {
        self.roots.iter().find(|r| r.name == name)
    }
}

impl std::fmt::Debug for ResourceRoots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRoots")
            .field("roots", &self.roots)
            .field("url_prefix", &self.url_prefix)
            .finish()
    }
}

/// Reject ids that would escape a root directory
fn validate_resource_id(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id.contains("..") || id.contains(['/', '\\']) {
        return Err(LikeALookError::InvalidArgument(format!(
            "Invalid resource id '{id}'"
        )));
    }
    Ok(())
}

/// Guess a content type from the file extension
pub fn content_type_for(id: &str) -> &'static str {
    let extension = id
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeral::EphemeralConfig;

    fn roots_in(dir: &std::path::Path) -> ResourceRoots {
        std::fs::create_dir_all(dir.join("faces")).unwrap();
        std::fs::create_dir_all(dir.join("originals")).unwrap();
        std::fs::write(dir.join("faces").join("DP001.jpg"), b"face").unwrap();
        std::fs::write(dir.join("originals").join("DP002.png"), b"original").unwrap();

        ResourceRoots::new(
            vec![
                ResourceRoot::new("faces", dir.join("faces")),
                ResourceRoot::new("originals", dir.join("originals"))
                    .with_description("Full scans"),
                ResourceRoot::new(EPHEMERAL_COLLECTION, dir.join("nowhere")),
            ],
            "http://localhost:3000/resource",
            Arc::new(EphemeralStore::new(EphemeralConfig::default())),
        )
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/r/", "a/b"), "http://h/r/a/b");
        assert_eq!(join_url("http://h/r", "a/b"), "http://h/r/a/b");
    }

    #[test]
    fn test_reserved_name_is_not_a_root() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_in(dir.path());
        assert_eq!(roots.names().collect::<Vec<_>>(), vec!["faces", "originals"]);
        assert_eq!(roots.description("originals"), Some("Full scans"));
        assert_eq!(roots.description("faces"), Some("faces"));
        assert_eq!(
            roots.url_for("faces", "DP001.jpg"),
            "http://localhost:3000/resource/faces/DP001.jpg"
        );
    }

    #[tokio::test]
    async fn test_resolve_qualified() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_in(dir.path());

        let resource = roots.resolve("faces", "DP001.jpg").await.unwrap();
        assert_eq!(resource.data, b"face");
        assert_eq!(resource.content_type, "image/jpeg");

        assert!(matches!(
            roots.resolve("faces", "DP999.jpg").await,
            Err(LikeALookError::NotFound(_))
        ));
        assert!(matches!(
            roots.resolve("unknown", "DP001.jpg").await,
            Err(LikeALookError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_in(dir.path());

        for bad in ["..", "../secret", "a\\b", ""] {
            assert!(
                matches!(
                    roots.resolve("faces", bad).await,
                    Err(LikeALookError::InvalidArgument(_))
                ),
                "'{bad}' should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_unqualified_searches_all_roots() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_in(dir.path());

        let resource = roots.resolve_unqualified("DP002.png").await.unwrap();
        assert_eq!(resource.data, b"original");
        assert_eq!(resource.content_type, "image/png");

        let resource = roots.resolve_unqualified("faces/DP001.jpg").await.unwrap();
        assert_eq!(resource.data, b"face");

        assert!(matches!(
            roots.resolve_unqualified("DP404.jpg").await,
            Err(LikeALookError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_unqualified_rejects_two_slashes() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_in(dir.path());

        assert!(matches!(
            roots.resolve_unqualified("faces/sub/DP001.jpg").await,
            Err(LikeALookError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_ephemeral_collection_routes_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_in(dir.path());
        let id = roots.ephemerals().put(Some("upload.jpg".into()), b"staged".to_vec());

        let resource = roots.resolve(EPHEMERAL_COLLECTION, &id).await.unwrap();
        assert_eq!(resource.data, b"staged");

        let resource = roots.resolve_unqualified("upload.jpg").await.unwrap();
        assert_eq!(resource.data, b"staged");

        assert!(matches!(
            roots.resolve(EPHEMERAL_COLLECTION, "missing").await,
            Err(LikeALookError::NotFound(_))
        ));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
