//! Gallery rendering tests for `GET /images`.

use axum::http::{header, StatusCode};

use super::test_utils::{
    body_json, body_text, get, Failure, MockAuthClient, MockImageClient, TestGateway,
};

fn gateway(images: MockImageClient) -> TestGateway {
    TestGateway::new(MockAuthClient::new(), images)
}

#[tokio::test]
async fn test_gallery_renders_every_listed_image() {
    let gw = gateway(
        MockImageClient::new()
            .with_image("1_cat.png", Some("image/png"), "abc")
            .with_broken_image("2_broken.png")
            .with_image("3_dog.jpg", None, "xyz"),
    );

    let response = gw.send(get("/images", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = body_text(response).await;
    assert_eq!(html.matches(r#"class="gallery-item""#).count(), 3);
    assert_eq!(html.matches("<img ").count(), 2);
    assert_eq!(html.matches("Failed to load image").count(), 1);
    assert!(html.contains("data:image/png;base64,YWJj"));
    assert!(html.contains("data:image/jpeg;base64,eHl6"));
    assert!(html.contains(">cat.png<"));
    assert!(html.contains(">broken.png<"));
    assert!(html.contains("3 image(s)"));

    assert_eq!(gw.images.list_calls(), 1);
    assert_eq!(gw.images.fetch_calls(), 3);
    assert_eq!(
        gw.images.list_tokens(),
        vec![Some("Bearer abc".to_string())]
    );
}

#[tokio::test]
async fn test_gallery_empty_listing() {
    let gw = gateway(MockImageClient::new());

    let response = gw.send(get("/images", Some("Bearer abc"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("No images uploaded yet."));
    assert_eq!(gw.images.fetch_calls(), 0);
}

#[tokio::test]
async fn test_gallery_without_token() {
    let gw = gateway(MockImageClient::new().with_image("1_cat.png", None, "abc"));

    let response = gw.send(get("/images", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(gw.images.list_calls(), 0);
}

#[tokio::test]
async fn test_gallery_with_rejected_token() {
    let gw = gateway(MockImageClient::new().failing_list(Failure::Status(401, Some("bad token"))));

    let response = gw.send(get("/images", Some("Bearer stale"))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid token");
}

#[tokio::test]
async fn test_gallery_listing_failure() {
    for failure in [Failure::Status(503, None), Failure::Timeout] {
        let gw = gateway(MockImageClient::new().failing_list(failure));

        let response = gw.send(get("/images", Some("Bearer abc"))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Failed to fetch images");
        assert_eq!(gw.images.fetch_calls(), 0);
    }
}
