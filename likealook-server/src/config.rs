//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use likealook_core::ephemeral::{DEFAULT_MAX_AGE_SECS, DEFAULT_MAX_ENTRIES};
use likealook_core::resources::DEFAULT_URL_PREFIX;
use likealook_core::{
    Collection, EphemeralConfig, RemoteConfig, ResourceRoot, DEFAULT_MAX_MATCHES_LIMIT,
};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum image size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Stage uploads in the ephemeral store (default: true)
    pub ephemeral_enabled: bool,
    /// Seconds an upload stays retrievable (default: 300)
    pub ephemeral_max_age_secs: i64,
    /// Maximum number of staged uploads (default: 100)
    pub ephemeral_max_entries: usize,
    /// Absolute prefix of resource URLs, reachable by the remote matcher
    pub resource_url_prefix: String,
    /// Named image collections served under `/resource/{name}/`
    pub resource_roots: Vec<ResourceRoot>,
    /// Metadata CSV files or directories holding them
    pub metadata_csv: Vec<PathBuf>,
    /// Base URL of the remote matcher; `daner_v1` is unavailable without it
    pub remote_matcher_url: Option<String>,
    /// Remote matcher connect timeout in milliseconds (default: 500)
    pub remote_connect_timeout_ms: u64,
    /// Remote matcher read timeout in seconds (default: 10)
    pub remote_read_timeout_secs: u64,
    /// Collection used when a request names none (default: daner_mock)
    pub default_collection: Collection,
    /// Matches per element when a request gives no limit (default: 10)
    pub default_max_matches: usize,
    /// Largest `max_matches` a request may ask for (default: 100)
    pub max_matches_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            ephemeral_enabled: true,
            ephemeral_max_age_secs: DEFAULT_MAX_AGE_SECS,
            ephemeral_max_entries: DEFAULT_MAX_ENTRIES,
            resource_url_prefix: DEFAULT_URL_PREFIX.to_string(),
            resource_roots: Vec::new(),
            metadata_csv: Vec::new(),
            remote_matcher_url: None,
            remote_connect_timeout_ms: 500,
            remote_read_timeout_secs: 10,
            default_collection: Collection::DanerMock,
            default_max_matches: 10,
            max_matches_limit: DEFAULT_MAX_MATCHES_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|origins| split_list(&origins).map(str::to_string).collect());

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let ephemeral_enabled = std::env::var("EPHEMERAL_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(defaults.ephemeral_enabled);

        let resource_roots = std::env::var("RESOURCE_ROOTS")
            .map(|v| parse_resource_roots(&v))
            .unwrap_or_default();

        let metadata_csv = std::env::var("METADATA_CSV")
            .map(|v| split_list(&v).map(PathBuf::from).collect())
            .unwrap_or_default();

        let remote_matcher_url = std::env::var("REMOTE_MATCHER_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .and_then(|u| match url::Url::parse(u.trim()) {
                Ok(_) => Some(u.trim().to_string()),
                Err(e) => {
                    tracing::warn!(url = %u, error = %e, "Ignoring invalid REMOTE_MATCHER_URL");
                    None
                }
            });

        let default_collection = match std::env::var("DEFAULT_COLLECTION") {
            Ok(name) => name.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to daner_mock as default collection");
                defaults.default_collection
            }),
            Err(_) => defaults.default_collection,
        };

        Self {
            port: env_or("PORT", defaults.port),
            host,
            allowed_origins,
            body_limit_mb: env_or("BODY_LIMIT_MB", defaults.body_limit_mb),
            max_file_size_mb: env_or("MAX_FILE_SIZE_MB", defaults.max_file_size_mb),
            timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_or("RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            rate_limit_burst: env_or("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            ephemeral_enabled,
            ephemeral_max_age_secs: env_or("EPHEMERAL_MAX_AGE_SECS", defaults.ephemeral_max_age_secs),
            ephemeral_max_entries: env_or("EPHEMERAL_MAX_ENTRIES", defaults.ephemeral_max_entries),
            resource_url_prefix: std::env::var("RESOURCE_URL_PREFIX")
                .unwrap_or(defaults.resource_url_prefix),
            resource_roots,
            metadata_csv,
            remote_matcher_url,
            remote_connect_timeout_ms: env_or(
                "REMOTE_CONNECT_TIMEOUT_MS",
                defaults.remote_connect_timeout_ms,
            ),
            remote_read_timeout_secs: env_or(
                "REMOTE_READ_TIMEOUT_SECS",
                defaults.remote_read_timeout_secs,
            ),
            default_collection,
            default_max_matches: env_or("DEFAULT_MAX_MATCHES", defaults.default_max_matches),
            max_matches_limit: env_or("MAX_MATCHES_LIMIT", defaults.max_matches_limit),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn ephemeral_config(&self) -> EphemeralConfig {
        EphemeralConfig {
            enabled: self.ephemeral_enabled,
            max_age_secs: self.ephemeral_max_age_secs,
            max_entries: self.ephemeral_max_entries,
            url_prefix: self.resource_url_prefix.clone(),
        }
    }

    pub fn remote_config(&self) -> Option<RemoteConfig> {
        self.remote_matcher_url.as_ref().map(|base_url| RemoteConfig {
            base_url: base_url.clone(),
            connect_timeout: Duration::from_millis(self.remote_connect_timeout_ms),
            read_timeout: Duration::from_secs(self.remote_read_timeout_secs),
        })
    }

    /// Log settings that leave the service running in a reduced mode
    pub fn warn_degraded(&self) {
        if self.remote_matcher_url.is_some() {
            match url::Url::parse(&self.resource_url_prefix) {
                Ok(url) if url.host_str().is_some() => {}
                _ => tracing::warn!(
                    prefix = %self.resource_url_prefix,
                    "RESOURCE_URL_PREFIX is not an absolute URL, the remote matcher cannot fetch uploads"
                ),
            }
            if !self.ephemeral_enabled {
                tracing::warn!("Ephemeral store disabled, daner_v1 requests will fail");
            }
        }
        if self.metadata_csv.is_empty() {
            tracing::warn!("METADATA_CSV not set, results carry no metadata and daner_mock has no candidates");
        }
        if self.default_max_matches == 0 {
            tracing::warn!("DEFAULT_MAX_MATCHES is 0, requests without max_matches return no matches");
        }
        if self.default_max_matches > self.max_matches_limit {
            tracing::warn!(
                default_max_matches = self.default_max_matches,
                max_matches_limit = self.max_matches_limit,
                "DEFAULT_MAX_MATCHES exceeds MAX_MATCHES_LIMIT, requests without max_matches will be rejected"
            );
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse `name=path` pairs separated by commas
pub fn parse_resource_roots(value: &str) -> Vec<ResourceRoot> {
    split_list(value)
        .filter_map(|entry| match entry.split_once('=') {
            Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
                Some(ResourceRoot::new(name.trim(), path.trim()))
            }
            _ => {
                tracing::warn!(entry = %entry, "Ignoring malformed RESOURCE_ROOTS entry, expected name=path");
                None
            }
        })
        .collect()
}
