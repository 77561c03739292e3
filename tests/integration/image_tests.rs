//! Image pass-through tests for `GET /images/{filename}` and `GET /api/images`.

use axum::http::{header, StatusCode};

use super::test_utils::{
    body_bytes, body_json, get, Failure, MockAuthClient, MockImageClient, TestGateway,
};

const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg\xff\xd9";

fn gateway(images: MockImageClient) -> TestGateway {
    TestGateway::new(MockAuthClient::new(), images)
}

// =============================================================================
// Retrieval
// =============================================================================

#[tokio::test]
async fn test_fetch_streams_bytes_with_reported_content_type() {
    let gw = gateway(MockImageClient::new().with_image("1_cat.png", Some("image/png"), "png-bytes"));

    let response = gw.send(get("/images/1_cat.png", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "inline; filename=\"1_cat.png\""
    );
    assert_eq!(&body_bytes(response).await[..], b"png-bytes");
}

#[tokio::test]
async fn test_fetch_derives_content_type_from_extension() {
    let gw = gateway(
        MockImageClient::new()
            .with_image("2_dog.JPG", None, JPEG_BYTES)
            .with_image("3_blob.dat", None, "raw"),
    );

    let response = gw.send(get("/images/2_dog.JPG", Some("Bearer abc"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(&body_bytes(response).await[..], JPEG_BYTES);

    let response = gw.send(get("/images/3_blob.dat", Some("Bearer abc"))).await;
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
}

#[tokio::test]
async fn test_fetch_is_idempotent() {
    let gw = gateway(MockImageClient::new().with_image("1_cat.png", Some("image/png"), JPEG_BYTES));

    let first = body_bytes(gw.send(get("/images/1_cat.png", Some("Bearer abc"))).await).await;
    let second = body_bytes(gw.send(get("/images/1_cat.png", Some("Bearer abc"))).await).await;

    assert_eq!(first, second);
    assert_eq!(gw.images.fetch_calls(), 2);
}

#[tokio::test]
async fn test_fetch_without_token_skips_image_service() {
    let gw = gateway(MockImageClient::new().with_image("1_cat.png", Some("image/png"), "x"));

    let response = gw.send(get("/images/1_cat.png", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(gw.images.fetch_calls(), 0);
}

#[tokio::test]
async fn test_fetch_missing_image_passes_status_and_detail() {
    let gw = gateway(MockImageClient::new());

    let response = gw.send(get("/images/nope.png", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Image not found");
}

#[tokio::test]
async fn test_fetch_timeout_is_server_error() {
    let gw = gateway(
        MockImageClient::new()
            .with_image("1_cat.png", Some("image/png"), "x")
            .failing_fetch(Failure::Timeout),
    );

    let response = gw.send(get("/images/1_cat.png", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to fetch image");
}

#[tokio::test]
async fn test_fetch_forbidden_passes_through() {
    let gw = gateway(MockImageClient::new().failing_fetch(Failure::Status(403, None)));

    let response = gw.send(get("/images/1_cat.png", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Failed to fetch image");
}

// =============================================================================
// JSON Listing
// =============================================================================

#[tokio::test]
async fn test_api_listing_without_token() {
    let gw = gateway(
        MockImageClient::new()
            .with_image("1_a.png", Some("image/png"), "aaaa")
            .with_image("2_b.png", Some("image/png"), "bb"),
    );

    let response = gw.send(get("/api/images", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let images = body.as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["filename"], "1_a.png");
    assert_eq!(images[0]["size"], 4);
    assert_eq!(gw.images.list_tokens(), vec![None]);
}

#[tokio::test]
async fn test_api_listing_forwards_token_when_present() {
    let gw = gateway(MockImageClient::new());

    let response = gw.send(get("/api/images", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        gw.images.list_tokens(),
        vec![Some("Bearer abc".to_string())]
    );
}

#[tokio::test]
async fn test_api_listing_passes_collaborator_status_through() {
    let gw = gateway(MockImageClient::new().failing_list(Failure::Status(401, None)));

    let response = gw.send(get("/api/images", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Failed to fetch images");

    let gw = gateway(MockImageClient::new().failing_list(Failure::Status(404, Some("no bucket"))));

    let response = gw.send(get("/api/images", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, serde_json::json!({"error": "no bucket"}));
}

#[tokio::test]
async fn test_api_listing_timeout_is_server_error() {
    let gw = gateway(MockImageClient::new().failing_list(Failure::Timeout));

    let response = gw.send(get("/api/images", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to fetch images");
}
