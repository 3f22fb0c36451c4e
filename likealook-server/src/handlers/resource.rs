//! Resource delivery handlers
//!
//! Serves images from the configured collections and staged uploads from
//! the reserved `ephemeral` collection.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use likealook_core::Resource;

use crate::error::ApiError;
use crate::state::AppState;

/// Fetch a resource from a named collection
#[utoipa::path(
    get,
    path = "/resource/{collection}/{id}",
    tag = "Resources",
    params(
        ("collection" = String, Path, description = "Collection name, or 'ephemeral' for staged uploads"),
        ("id" = String, Path, description = "File name within the collection")
    ),
    responses(
        (status = 200, description = "Resource bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Unknown collection, missing or expired resource")
    )
)]
pub async fn resource_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let resource = state.resources.resolve(&collection, &id).await?;
    Ok(into_response(resource))
}

/// Fetch a resource by id alone
///
/// The id may be qualified as `collection/id` (URL-encoded). Unqualified ids
/// are looked up among staged uploads first, then in every collection.
#[utoipa::path(
    get,
    path = "/resource/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource id, optionally qualified as collection/id")),
    responses(
        (status = 200, description = "Resource bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Id contains more than one '/'"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn unqualified_resource_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let resource = state.resources.resolve_unqualified(&id).await?;
    Ok(into_response(resource))
}

/// Ids spanning more than two path segments are never served, but reach the
/// same validation as the encoded form instead of the route fallback.
pub async fn nested_resource_handler(
    State(state): State<AppState>,
    Path((collection, id, rest)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let resource = state
        .resources
        .resolve_unqualified(&format!("{collection}/{id}/{rest}"))
        .await?;
    Ok(into_response(resource))
}

fn into_response(resource: Resource) -> Response {
    ([(header::CONTENT_TYPE, resource.content_type)], resource.data).into_response()
}
