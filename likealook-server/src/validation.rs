//! Upload validation module
//!
//! Provides validation utilities for multipart image uploads.

use likealook_core::EPHEMERALS_DISABLED;

use crate::error::ApiError;

/// Allowed MIME type categories for portrait uploads
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "application/octet-stream"];

/// Validates the Content-Type of an uploaded image
///
/// Accepts:
/// - image/* (image/jpeg, image/png, image/webp, etc.)
/// - application/octet-stream (binary data)
///
/// Returns an error if the Content-Type is not supported.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{}'. Allowed types: image/*, application/octet-stream",
                    ct
                )))
            }
        }
        // Allow missing Content-Type (treat as binary)
        None => Ok(()),
    }
}

/// Validates the size of an uploaded image
///
/// Returns an error if the image is empty or exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size == 0 {
        return Err(ApiError::bad_request("Image is empty"));
    }
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}

/// Validates a caller-supplied source id
///
/// The id becomes the name of the staged upload, so it must be usable as a
/// single resource path segment, and it must not collide with the id the
/// store hands out when staging is disabled.
pub fn validate_source_id(id: &str) -> Result<(), ApiError> {
    if id.contains(['/', '\\']) || id.contains("..") {
        return Err(ApiError::bad_request(format!(
            "Invalid source_id '{id}': must not contain '/', '\\' or '..'"
        )));
    }
    if id == EPHEMERALS_DISABLED {
        return Err(ApiError::bad_request(format!(
            "Invalid source_id '{id}': reserved"
        )));
    }
    Ok(())
}

/// Parses the `max_matches` form value, accepting 1 to `limit`
pub fn parse_max_matches(value: &str, limit: usize) -> Result<usize, ApiError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ApiError::bad_request("max_matches must be at least 1")),
        Ok(n) if n > limit => Err(ApiError::bad_request(format!(
            "max_matches must not exceed {limit}, got {n}"
        ))),
        Ok(n) => Ok(n),
        Err(_) => Err(ApiError::bad_request(format!(
            "max_matches must be a positive integer, got '{value}'"
        ))),
    }
}
