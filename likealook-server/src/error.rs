//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use likealook_core::LikeALookError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested route or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Service unavailable - required data or service is not available
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Core error - error from the search library
    #[error(transparent)]
    Core(#[from] LikeALookError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Core(ref e) => match e {
                LikeALookError::NotFound(_) => StatusCode::NOT_FOUND,
                LikeALookError::InvalidArgument(_) => StatusCode::BAD_REQUEST,

                // The matcher answered, but not usefully → 502
                LikeALookError::InvalidUpstreamResponse { .. }
                | LikeALookError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,

                // Missing backend, data or staging → 503
                LikeALookError::RemoteUnavailable { .. }
                | LikeALookError::BackendNotConfigured(_)
                | LikeALookError::NoCandidates(_)
                | LikeALookError::EphemeralsDisabled => StatusCode::SERVICE_UNAVAILABLE,

                LikeALookError::Io(_) | LikeALookError::HttpClient(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Core(ref e) => match e {
                LikeALookError::NotFound(_) => "NOT_FOUND",
                LikeALookError::InvalidArgument(_) => "INVALID_ARGUMENT",
                LikeALookError::InvalidUpstreamResponse { .. } => "INVALID_UPSTREAM_RESPONSE",
                LikeALookError::RemoteUnavailable { .. } => "REMOTE_UNAVAILABLE",
                LikeALookError::UpstreamStatus { .. } => "UPSTREAM_ERROR",
                LikeALookError::BackendNotConfigured(_) => "BACKEND_NOT_CONFIGURED",
                LikeALookError::NoCandidates(_) => "NO_CANDIDATES",
                LikeALookError::EphemeralsDisabled => "EPHEMERALS_DISABLED",
                LikeALookError::Io(_) => "IO_ERROR",
                LikeALookError::HttpClient(_) => "INTERNAL_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Upstream bodies, URLs and I/O paths stay in the logs
            Self::Core(ref e) => match e {
                LikeALookError::NotFound(msg) | LikeALookError::InvalidArgument(msg) => {
                    msg.clone()
                }
                LikeALookError::InvalidUpstreamResponse { .. } => {
                    "Invalid response from the similarity service".to_string()
                }
                LikeALookError::RemoteUnavailable { .. } => {
                    "Similarity service unavailable".to_string()
                }
                LikeALookError::UpstreamStatus { status } => {
                    format!("Similarity service returned status {status}")
                }
                LikeALookError::BackendNotConfigured(collection) => {
                    format!("Collection '{collection}' is not available on this server")
                }
                LikeALookError::NoCandidates(_) => {
                    "No portraits available to compare against".to_string()
                }
                LikeALookError::EphemeralsDisabled => {
                    "Image staging is disabled, the similarity service cannot fetch the image"
                        .to_string()
                }
                LikeALookError::Io(_) => "Failed to read resource".to_string(),
                LikeALookError::HttpClient(_) => "Internal error".to_string(),
            },
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Core(_) => "core",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                client_message = %client_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
