//! Similarity search handlers
//!
//! Handles POST /similar uploads and lists the collections they can target.

use axum::{
    extract::{Multipart, State},
    Json,
};
use likealook_core::{Collection, CollectionInfo, RankedResult};
use tracing::debug;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::{parse_max_matches, validate_source_id};

/// List similarity collections
///
/// `available` is false for collections whose backend is not configured.
#[utoipa::path(
    get,
    path = "/collections",
    tag = "Similarity",
    responses((status = 200, description = "Known collections", body = Vec<CollectionInfo>))
)]
pub async fn collections_handler(State(state): State<AppState>) -> Json<Vec<CollectionInfo>> {
    Json(state.similarity.collections())
}

/// Find portraits similar to an uploaded image
///
/// Accepts multipart/form-data with:
/// - **image** (required): The portrait to match (max 25MB)
/// - **collection** (optional): "daner_mock" or "daner_v1" (default: server configured)
/// - **source_id** (optional): Name for the staged upload (default: generated UUID)
/// - **max_matches** (optional): Matches per detected face (default: 10, max: 100)
///
/// The upload is staged under `/resource/ephemeral/{source_id}` for a few
/// minutes so the similarity service can fetch it.
#[utoipa::path(
    post,
    path = "/similar",
    tag = "Similarity",
    request_body(
        content_type = "multipart/form-data",
        description = "Portrait image with optional search parameters"
    ),
    responses(
        (status = 200, description = "Ranked similar portraits", body = RankedResult),
        (status = 400, description = "Invalid request (missing image, unknown collection, bad max_matches)"),
        (status = 413, description = "Request body too large"),
        (status = 502, description = "Similarity service returned an unusable response"),
        (status = 503, description = "Similarity service or its data unavailable")
    )
)]
pub async fn similar_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RankedResult>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let image = fields.take_file()?;

    let collection = fields
        .get_text("collection")
        .map(str::parse::<Collection>)
        .transpose()?
        .unwrap_or(state.default_collection);

    let max_matches = fields
        .get_text("max_matches")
        .map(|value| parse_max_matches(value, state.max_matches_limit))
        .transpose()?
        .unwrap_or(state.default_max_matches);

    let source_id = fields.get_text("source_id").map(str::to_string);
    if let Some(id) = &source_id {
        validate_source_id(id)?;
    }

    debug!(
        collection = %collection,
        max_matches,
        bytes = image.data.len(),
        content_type = ?image.content_type,
        file_name = ?image.file_name,
        "Similarity request"
    );

    let result = state
        .similarity
        .find_similar(collection, image.data, source_id, max_matches)
        .await?;
    Ok(Json(result))
}
