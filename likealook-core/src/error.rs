use thiserror::Error;

use crate::matcher::Collection;

#[derive(Error, Debug)]
pub enum LikeALookError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote matcher answered with JSON in neither accepted shape.
    /// `excerpt` never exceeds [`crate::matcher::EXCERPT_LIMIT`] characters.
    #[error("Invalid upstream response ({reason}): {excerpt}")]
    InvalidUpstreamResponse { reason: String, excerpt: String },

    #[error("Remote matcher at {url} unavailable: {source}")]
    RemoteUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Remote matcher returned status: {status}")]
    UpstreamStatus { status: u16 },

    #[error("Collection '{0}' has no configured backend")]
    BackendNotConfigured(Collection),

    #[error("No candidates available: {0}")]
    NoCandidates(String),

    #[error("Ephemeral store is disabled")]
    EphemeralsDisabled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl LikeALookError {
    /// True when the failure lies with the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, LikeALookError>;
