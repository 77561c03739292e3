//! Upload relay tests.
//!
//! Every request that stages a file must leave the staging directory empty,
//! whatever the image service answers.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use super::test_utils::{
    body_json, multipart_request, post_json, Failure, FormPart, MockAuthClient, MockImageClient,
    TestGateway, PUBLIC_BASE_URL,
};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-payload";

fn gateway(images: MockImageClient) -> TestGateway {
    TestGateway::new(MockAuthClient::new(), images)
}

// =============================================================================
// Multipart Upload
// =============================================================================

#[tokio::test]
async fn test_upload_success_relays_file_and_cleans_up() {
    let gw = gateway(MockImageClient::new());

    let response = gw
        .send(multipart_request(
            "/upload",
            Some("Bearer abc"),
            &[
                FormPart::text("description", "a cat"),
                FormPart::file("cat.png", "image/png", PNG_BYTES),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Uploaded successfully");
    assert_eq!(body["filename"], "42_cat.png");
    assert_eq!(
        body["url"],
        format!("{}/images/42_cat.png", PUBLIC_BASE_URL)
    );

    let uploads = gw.images.uploads();
    assert_eq!(uploads.len(), 1);
    let (part, token) = &uploads[0];
    assert_eq!(part.file_name, "cat.png");
    assert_eq!(part.content_type.as_deref(), Some("image/png"));
    assert_eq!(&part.data[..], PNG_BYTES);
    assert_eq!(token, "Bearer abc");

    assert_eq!(gw.staged_files(), 0);
}

#[tokio::test]
async fn test_upload_large_file_is_not_truncated() {
    let gw = gateway(MockImageClient::new());
    let data: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

    let response = gw
        .send(multipart_request(
            "/upload",
            Some("Bearer abc"),
            &[FormPart::file("big.bin", "application/octet-stream", &data)],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let uploads = gw.images.uploads();
    assert_eq!(uploads[0].0.length, data.len() as u64);
    assert_eq!(&uploads[0].0.data[..], &data[..]);
    assert_eq!(gw.staged_files(), 0);
}

#[tokio::test]
async fn test_upload_without_token_is_rejected_before_staging() {
    let gw = gateway(MockImageClient::new());

    let response = gw
        .send(multipart_request(
            "/upload",
            None,
            &[FormPart::file("cat.png", "image/png", PNG_BYTES)],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"],
        "Missing authorization token"
    );
    assert_eq!(gw.images.upload_calls(), 0);
    assert_eq!(gw.staged_files(), 0);
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let gw = gateway(MockImageClient::new());

    let response = gw
        .send(multipart_request(
            "/upload",
            Some("Bearer abc"),
            &[FormPart::text("description", "no file here")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No file uploaded");
    assert_eq!(gw.images.upload_calls(), 0);
}

#[tokio::test]
async fn test_upload_with_non_multipart_body() {
    let gw = gateway(MockImageClient::new());

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::AUTHORIZATION, "Bearer abc")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file":"cat.png"}"#))
        .unwrap();
    let response = gw.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(gw.images.upload_calls(), 0);
}

#[tokio::test]
async fn test_upload_with_two_files_is_rejected() {
    let gw = gateway(MockImageClient::new());

    let response = gw
        .send(multipart_request(
            "/upload",
            Some("Bearer abc"),
            &[
                FormPart::file("a.png", "image/png", PNG_BYTES),
                FormPart::file("b.png", "image/png", PNG_BYTES),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(gw.images.upload_calls(), 0);
    assert_eq!(gw.staged_files(), 0);
}

#[tokio::test]
async fn test_upload_backend_error_status_passes_through() {
    let gw = gateway(
        MockImageClient::new().failing_upload(Failure::Status(401, Some("Invalid token"))),
    );

    let response = gw
        .send(multipart_request(
            "/upload",
            Some("Bearer stale"),
            &[FormPart::file("cat.png", "image/png", PNG_BYTES)],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid token");
    assert_eq!(gw.images.upload_calls(), 1);
    assert_eq!(gw.staged_files(), 0);
}

#[tokio::test]
async fn test_upload_backend_500_cleans_up() {
    let gw = gateway(MockImageClient::new().failing_upload(Failure::Status(500, None)));

    let response = gw
        .send(multipart_request(
            "/upload",
            Some("Bearer abc"),
            &[FormPart::file("cat.png", "image/png", PNG_BYTES)],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to upload image");
    assert_eq!(gw.staged_files(), 0);
}

#[tokio::test]
async fn test_upload_backend_timeout_cleans_up() {
    let gw = gateway(MockImageClient::new().failing_upload(Failure::Timeout));

    let response = gw
        .send(multipart_request(
            "/upload",
            Some("Bearer abc"),
            &[FormPart::file("cat.png", "image/png", PNG_BYTES)],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to upload image");
    assert_eq!(gw.staged_files(), 0);
}

#[tokio::test]
async fn test_concurrent_uploads_do_not_collide() {
    let gw = gateway(MockImageClient::new());

    let requests = (0..8).map(|i| {
        let name = format!("img{}.png", i);
        let data = vec![i as u8; 1024 * (i + 1)];
        let request = multipart_request(
            "/upload",
            Some("Bearer abc"),
            &[FormPart::file(&name, "image/png", &data)],
        );
        gw.send(request)
    });
    let responses = futures_util::future::join_all(requests).await;

    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
    }

    let uploads = gw.images.uploads();
    assert_eq!(uploads.len(), 8);
    for (part, _) in uploads {
        let i: usize = part.file_name[3..part.file_name.len() - 4].parse().unwrap();
        assert_eq!(part.data.len(), 1024 * (i + 1));
        assert!(part.data.iter().all(|b| *b == i as u8));
    }
    assert_eq!(gw.staged_files(), 0);
}

// =============================================================================
// Legacy JSON Upload
// =============================================================================

#[tokio::test]
async fn test_legacy_json_upload_is_relayed() {
    let gw = gateway(MockImageClient::new());
    let payload = json!({"filename": "cat.png", "data": "aGVsbG8="});

    let response = gw.send(post_json("/api/images/upload", &payload)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["filename"], "cat.png");
    assert_eq!(gw.images.json_uploads(), vec![payload]);
}

#[tokio::test]
async fn test_legacy_json_upload_failure() {
    let gw = gateway(MockImageClient::new().failing_upload(Failure::Status(503, None)));

    let response = gw
        .send(post_json("/api/images/upload", &json!({"filename": "cat.png"})))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Upload failed");
}
