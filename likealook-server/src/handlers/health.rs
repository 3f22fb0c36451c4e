//! Health check handlers
//!
//! Provides liveness, health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Service name
    pub service: &'static str,
    /// Number of portraits in the metadata index
    pub metadata_records: usize,
    /// Whether the daner_v1 collection can be queried
    pub remote_configured: bool,
    pub ephemeral: EphemeralStats,
}

/// Ephemeral store diagnostics
#[derive(Serialize, ToSchema)]
pub struct EphemeralStats {
    pub enabled: bool,
    /// Physically held entries, expired ones included until touched
    pub entries: usize,
    pub max_entries: usize,
    pub max_age_secs: u64,
}

/// GET /ping - Liveness probe
#[utoipa::path(
    get,
    path = "/ping",
    tag = "Health",
    responses((status = 200, description = "Server is alive", body = String))
)]
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version, metadata and staging statistics.
/// The service is degraded when no metadata is loaded.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let metadata_records = state.index.size();
    let status = if metadata_records > 0 {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        service: "likealook-server",
        metadata_records,
        remote_configured: state.similarity.remote_configured(),
        ephemeral: EphemeralStats {
            enabled: state.ephemerals.is_enabled(),
            entries: state.ephemerals.len(),
            max_entries: state.ephemerals.max_entries(),
            max_age_secs: state.ephemerals.max_age().as_secs(),
        },
    })
}

/// Readiness response for Kubernetes
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// GET /ready - Kubernetes readiness probe
///
/// Returns 200 once the metadata index holds portraits, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to serve searches", body = ReadyResponse),
        (status = 503, description = "Metadata index is empty")
    )
)]
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, ApiError> {
    if state.index.is_empty() {
        return Err(ApiError::service_unavailable("Metadata index is empty"));
    }
    Ok(Json(ReadyResponse {
        ready: true,
        message: None,
    }))
}
