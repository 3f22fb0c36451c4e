//! Remote facial similarity matcher (`daner_v1`).
//!
//! The matcher is asked with `GET {base_url}/?imageurl={source_url}` and
//! fetches the source image itself, so the source must be staged at an
//! absolute URL it can reach. Calls are never retried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use super::parse::{parse_matches, rank};
use super::{Collection, SimilarityBackend, SourceImage};
use crate::error::{LikeALookError, Result};
use crate::metadata::MetadataIndex;
use crate::resources::join_url;
use crate::response::{assemble_elements, RankedResult};

/// Default timeout for establishing the connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default timeout for the whole request
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const TECHNOTE: &str = "Facial similarity by daner_v1 (remote call to similarity service)";

/// Configuration for the remote matcher client.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the matcher, e.g. `http://matcher.internal:8234`
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Client for the remote similarity matcher.
pub struct RemoteBackend {
    client: Client,
    endpoint: String,
    index: Arc<MetadataIndex>,
}

impl RemoteBackend {
    #[instrument(level = "debug", skip_all, fields(
        base_url = %config.base_url,
        connect_timeout_ms = config.connect_timeout.as_millis() as u64,
        read_timeout_ms = config.read_timeout.as_millis() as u64
    ))]
    pub fn new(config: RemoteConfig, index: Arc<MetadataIndex>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                LikeALookError::HttpClient(format!("Failed to create HTTP client: {e}"))
            })?;

        info!("Remote matcher client created");
        Ok(Self {
            client,
            endpoint: join_url(&config.base_url, ""),
            index,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, image_url: &str) -> Result<String> {
        let start = Instant::now();
        let unavailable = |source: reqwest::Error| LikeALookError::RemoteUnavailable {
            url: self.endpoint.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("imageurl", image_url)])
            .send()
            .await
            .map_err(|e| {
                warn!(
                    error = %e,
                    timeout = e.is_timeout(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Remote matcher request failed"
                );
                unavailable(e)
            })?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            warn!(
                status = %status,
                latency_ms = start.elapsed().as_millis() as u64,
                "Remote matcher returned an error status"
            );
            return Err(LikeALookError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            warn!(error = %e, "Failed to read remote matcher response");
            unavailable(e)
        })?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Remote matcher responded"
        );
        Ok(body)
    }
}

#[async_trait]
impl SimilarityBackend for RemoteBackend {
    #[instrument(skip(self, source), fields(source_id = %source.id))]
    async fn find_similar(&self, source: &SourceImage, max_matches: usize) -> Result<RankedResult> {
        let Some(image_url) = source.url.as_deref() else {
            warn!("Source image was not staged, the remote matcher cannot fetch it");
            return Err(LikeALookError::EphemeralsDisabled);
        };

        let body = self.fetch(image_url).await?;
        let groups = parse_matches(&body)?
            .into_iter()
            .map(|candidates| rank(candidates, max_matches))
            .collect();

        let elements = assemble_elements(groups, &self.index);
        info!(elements = elements.len(), "Remote similarity search completed");

        Ok(RankedResult {
            source_id: source.id.clone(),
            source_url: source.url.clone(),
            technote: TECHNOTE.to_string(),
            elements,
        })
    }

    fn collection(&self) -> Collection {
        Collection::DanerV1
    }
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
