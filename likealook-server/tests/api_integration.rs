//! API integration tests for likealook-server.
//!
//! These tests drive the router with realistic multipart requests against a
//! temporary image collection and metadata file, covering the upload,
//! search and resource delivery flow through the REST endpoints.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use likealook_core::ResourceRoot;
use likealook_server::{create_router, create_router_with_config, Config};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";

const METADATA: &str = "\
FileName;PersonsName;PersonsFamilyName;DateOfBirth;DateOfDeath;DateOfPhotography;PersonsJob;Photographer;Link
DP001.jpg;Karen;Blixen;17.4.1885;7.9.1962;1913;forfatter;Elfelt, Peter (1.11.1866-22.5.1931) fotograf;http://example.org/DP001
DP002.jpg;Hans Christian;Andersen;2.4.1805;4.8.1875;1869;digter;Hansen, Georg E. (1833-1891);http://example.org/DP002
DP003.jpg;Jens Johannes;Andersen;07.06.1846;04.04.1902;1875-1919;lærer;;http://example.org/DP003
";

/// Temporary collection `faces_90_256` plus a metadata file
struct Fixture {
    _dir: TempDir,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let faces = dir.path().join("faces_90_256");
        std::fs::create_dir_all(&faces).unwrap();
        for id in ["DP001", "DP002", "DP003"] {
            std::fs::write(faces.join(format!("{id}.jpg")), format!("jpeg:{id}")).unwrap();
        }
        let csv = dir.path().join("daner.csv");
        std::fs::write(&csv, METADATA).unwrap();

        let config = Config {
            resource_roots: vec![ResourceRoot::new("faces_90_256", faces)],
            metadata_csv: vec![csv],
            ..Default::default()
        };
        Self { _dir: dir, config }
    }

    fn app(&self) -> Router {
        create_router_with_config(&self.config).unwrap()
    }
}

/// Helper to create multipart body for a similarity request
fn create_similar_multipart(image: Option<&[u8]>, fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    if let Some(image) = image {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"image\"; filename=\"portrait.jpg\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

async fn post_similar(app: Router, image: Option<&[u8]>, fields: &[(&str, &str)]) -> Response {
    let (content_type, body) = create_similar_multipart(image, fields);
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/similar")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_ping_returns_pong() {
    let response = get(create_router().unwrap(), "/ping").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"pong");
}

#[tokio::test]
async fn test_health_without_metadata_is_degraded() {
    let response = get(create_router().unwrap(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["metadata_records"], 0);
    assert_eq!(json["remote_configured"], false);
    assert_eq!(json["ephemeral"]["enabled"], true);
    assert_eq!(json["ephemeral"]["max_entries"], 100);
    assert_eq!(json["ephemeral"]["max_age_secs"], 300);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_health_with_metadata_is_healthy() {
    let fixture = Fixture::new();
    let json = body_json(get(fixture.app(), "/health").await).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["metadata_records"], 3);
}

#[tokio::test]
async fn test_ready_requires_metadata() {
    let response = get(create_router().unwrap(), "/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "SERVICE_UNAVAILABLE");

    let fixture = Fixture::new();
    let response = get(fixture.app(), "/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

// ============================================================================
// Collections Tests
// ============================================================================

#[tokio::test]
async fn test_collections_lists_backends() {
    let json = body_json(get(create_router().unwrap(), "/collections").await).await;
    let collections = json.as_array().unwrap();

    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0]["id"], "daner_mock");
    assert_eq!(collections[0]["available"], true);
    assert_eq!(collections[1]["id"], "daner_v1");
    assert_eq!(collections[1]["available"], false);
}

// ============================================================================
// Similarity Tests
// ============================================================================

#[tokio::test]
async fn test_similar_mock_returns_enriched_matches() {
    let fixture = Fixture::new();
    let response = post_similar(
        fixture.app(),
        Some(b"fake jpeg"),
        &[("collection", "daner_mock"), ("max_matches", "2")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert!(json["technote"].as_str().unwrap().contains("mock"));
    assert_eq!(json["source_id"].as_str().unwrap().len(), 36);

    let elements = json["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 2);
    for (i, element) in elements.iter().enumerate() {
        assert_eq!(element["index"], i);
        let similars = element["similars"].as_array().unwrap();
        assert_eq!(similars.len(), 2);
        assert!(similars[0]["distance"].as_f64() < similars[1]["distance"].as_f64());
        assert!(similars[0]["person"]["last_name"].is_string());
        assert!(similars[0]["image"]["medium_url"]
            .as_str()
            .unwrap()
            .starts_with("http://127.0.0.1:3000/resource/faces_90_256/"));
    }
}

#[tokio::test]
async fn test_similar_uses_default_collection_and_limit() {
    let fixture = Fixture::new();
    let response = post_similar(fixture.app(), Some(b"fake jpeg"), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["technote"].as_str().unwrap().contains("mock"));
    assert_eq!(json["elements"][0]["similars"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_similar_stages_upload_as_resource() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let response = post_similar(
        app.clone(),
        Some(b"uploaded portrait"),
        &[("source_id", "me.jpg"), ("max_matches", "1")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["source_id"], "me.jpg");
    assert_eq!(
        json["source_url"],
        "http://127.0.0.1:3000/resource/ephemeral/me.jpg"
    );

    let response = get(app.clone(), "/resource/ephemeral/me.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(body_bytes(response).await, b"uploaded portrait");

    let response = get(app, "/resource/me.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"uploaded portrait");
}

#[tokio::test]
async fn test_similar_without_image() {
    let fixture = Fixture::new();
    let response = post_similar(fixture.app(), None, &[("collection", "daner_mock")]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_INPUT");
    assert!(json["error"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn test_similar_unknown_collection() {
    let fixture = Fixture::new();
    let response = post_similar(
        fixture.app(),
        Some(b"fake jpeg"),
        &[("collection", "daner_v2")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_similar_rejects_bad_parameters() {
    let fixture = Fixture::new();

    for fields in [
        [("max_matches", "0")],
        [("max_matches", "plenty")],
        [("max_matches", "101")],
        [("max_matches", "1000000000")],
        [("source_id", "../etc/passwd")],
        [("source_id", "EphemeralsNotEnabled")],
    ] {
        let response = post_similar(fixture.app(), Some(b"fake jpeg"), &fields).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{fields:?}");
    }
}

#[tokio::test]
async fn test_similar_max_matches_limit_is_configurable() {
    let fixture = Fixture::new();
    let config = Config {
        max_matches_limit: 3,
        ..fixture.config.clone()
    };
    let app = create_router_with_config(&config).unwrap();

    let response = post_similar(app.clone(), Some(b"fake jpeg"), &[("max_matches", "4")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_INPUT");

    let response = post_similar(app, Some(b"fake jpeg"), &[("max_matches", "3")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["elements"][0]["similars"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_similar_remote_not_configured() {
    let fixture = Fixture::new();
    let response = post_similar(
        fixture.app(),
        Some(b"fake jpeg"),
        &[("collection", "daner_v1")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "BACKEND_NOT_CONFIGURED");
}

#[tokio::test]
async fn test_similar_mock_without_metadata() {
    let response = post_similar(create_router().unwrap(), Some(b"fake jpeg"), &[]).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "NO_CANDIDATES");
}

#[tokio::test]
async fn test_similar_rejects_non_image_upload() {
    let fixture = Fixture::new();
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"x.html\"\r\n\
         Content-Type: text/html\r\n\r\n<html></html>\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/similar")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Resource Tests
// ============================================================================

#[tokio::test]
async fn test_resource_from_collection() {
    let fixture = Fixture::new();

    let response = get(fixture.app(), "/resource/faces_90_256/DP002.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(body_bytes(response).await, b"jpeg:DP002");

    let response = get(fixture.app(), "/resource/DP003.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"jpeg:DP003");
}

#[tokio::test]
async fn test_resource_not_found() {
    let fixture = Fixture::new();

    for uri in [
        "/resource/faces_90_256/DP999.jpg",
        "/resource/unknown/DP001.jpg",
        "/resource/ephemeral/never-uploaded",
        "/resource/DP999.jpg",
    ] {
        let response = get(fixture.app(), uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_resource_rejects_nested_ids() {
    let fixture = Fixture::new();

    let response = get(fixture.app(), "/resource/faces_90_256%2Fsub%2FDP001.jpg").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_ARGUMENT");

    let response = get(fixture.app(), "/resource/faces_90_256/..").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for uri in ["/resource/faces_90_256/sub/DP001.jpg", "/resource/a/b/c/d"] {
        let response = get(fixture.app(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_json(response).await["code"], "INVALID_ARGUMENT");
    }
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn test_unknown_route() {
    let response = get(create_router().unwrap(), "/nonexistent").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_openapi_document() {
    let response = get(create_router().unwrap(), "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["info"]["title"], "Like-a-Look API");
    assert!(json["paths"]["/similar"]["post"].is_object());
}
