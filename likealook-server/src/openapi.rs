//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/api-docs/openapi.json`.

use likealook_core::{
    Collection, CollectionInfo, Element, ImageInfo, ImageVariant, Person, RankedResult, Similar,
};
use utoipa::OpenApi;

use crate::handlers::{EphemeralStats, HealthResponse, ReadyResponse};

/// Like-a-Look API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Like-a-Look API",
        description = r#"
## Similar Portrait Search

Upload a portrait and get the most similar portraits from the DANER
collection of historical photographs, with the portrayed person, the
photographers and links to every image variant.

### How It Works

1. **Upload** a portrait via `POST /similar`
2. The image is staged for a few minutes under `/resource/ephemeral/{id}`
3. The similarity service fetches it and returns candidates per detected face
4. Candidates are ranked by distance (smaller is more similar) and enriched with metadata
"#,
        license(name = "Apache-2.0"),
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Similarity", description = "Find similar portraits"),
        (name = "Resources", description = "Image collections and staged uploads"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::ping,
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::similar::collections_handler,
        crate::handlers::similar::similar_handler,
        crate::handlers::resource::resource_handler,
        crate::handlers::resource::unqualified_resource_handler,
    ),
    components(
        schemas(
            HealthResponse,
            EphemeralStats,
            ReadyResponse,
            Collection,
            CollectionInfo,
            RankedResult,
            Element,
            Similar,
            ImageInfo,
            ImageVariant,
            Person,
        )
    )
)]
pub struct ApiDoc;
