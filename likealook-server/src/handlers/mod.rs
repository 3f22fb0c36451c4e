//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod resource;
pub mod similar;

pub use crate::state::AppState;
pub use health::{health, ping, ready, EphemeralStats, HealthResponse, ReadyResponse};
pub use resource::{nested_resource_handler, resource_handler, unqualified_resource_handler};
pub use similar::{collections_handler, similar_handler};

use crate::error::ApiError;

/// Fallback for unknown routes
pub async fn not_found_handler(uri: axum::http::Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
