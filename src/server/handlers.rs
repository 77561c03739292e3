//! HTTP request handlers for the gateway.
//!
//! Each handler checks the headers and fields its route requires, calls one
//! component, and translates the outcome into a status code and body. No
//! handler does more than that.
//!
//! # Endpoints
//!
//! - `GET /healthz`, `GET /livez` - Orchestration probes
//! - `GET /metrics` - Prometheus exposition
//! - `POST /register`, `POST /login` - Accounts
//! - `GET /private`, `GET /auth/verify` - Token checks
//! - `POST /upload`, `GET /images/{filename}`, `GET /images` - Images

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, Request, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::auth::CredentialForwarder;
use crate::backend::{
    resolve_content_type, AuthClient, Credentials, ImageClient, ImageDescriptor, TokenResponse,
    UploadReceipt,
};
use crate::error::{ApiError, AuthError, UploadError};
use crate::gallery::GalleryRenderer;
use crate::upload::UploadRelay;
use crate::users::Registrar;

use super::metrics::HttpMetrics;

/// Service name reported by `/` and `/ping`.
pub const SERVICE_NAME: &str = "api-service";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Login and token verification
    pub credentials: CredentialForwarder,

    /// Image service transport, used directly by pass-through routes
    pub images: Arc<dyn ImageClient>,

    /// Multipart upload staging and forwarding
    pub uploads: UploadRelay,

    /// HTML gallery
    pub gallery: GalleryRenderer,

    /// User registration
    pub registrar: Registrar,

    /// Request metrics
    pub metrics: Arc<HttpMetrics>,
}

impl AppState {
    /// Create state from the collaborator clients.
    ///
    /// Registration is unavailable until [`AppState::with_registrar`] is called.
    pub fn new(
        auth: Arc<dyn AuthClient>,
        images: Arc<dyn ImageClient>,
        uploads: UploadRelay,
        metrics: Arc<HttpMetrics>,
    ) -> Self {
        Self {
            credentials: CredentialForwarder::new(auth),
            gallery: GalleryRenderer::new(Arc::clone(&images)),
            images,
            uploads,
            registrar: Registrar::unavailable(),
            metrics,
        }
    }

    /// Set the registrar used by `/register`.
    pub fn with_registrar(mut self, registrar: Registrar) -> Self {
        self.registrar = registrar;
        self
    }
}

/// Non-empty `Authorization` header value, forwarded verbatim.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body returned for all error conditions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    /// Request path, set only by the last-resort handlers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            path: None,
        }
    }

    pub fn with_path(error: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            path: Some(path.into()),
        }
    }
}

/// Probe response (`ready` / `alive`).
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
}

/// Response of `/ping`.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Response of `/`.
#[derive(Debug, Serialize)]
pub struct ServiceInfoResponse {
    pub service: &'static str,
    pub message: &'static str,
    pub version: &'static str,
}

/// Plain message body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response of `/auth/verify`.
#[derive(Debug, Serialize)]
pub struct VerifyResultResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Response of `/upload`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub filename: String,
    pub url: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ApiError to HTTP response.
///
/// 5xx errors are logged at ERROR level, 404s at DEBUG, other 4xx at WARN.
/// The body never carries more than the error text.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::MissingCredential(_) => (StatusCode::BAD_REQUEST, "missing_credential"),
            ApiError::MissingToken => (StatusCode::UNAUTHORIZED, "missing_token"),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            ApiError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "invalid_token"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::CollaboratorUnavailable { status, .. } => (
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "collaborator_unavailable",
            ),
            ApiError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let body = match self {
            ApiError::Internal {
                path: Some(path), ..
            } => ErrorResponse::with_path(message, path),
            _ => ErrorResponse::new(message),
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Service Handlers
// =============================================================================

/// `GET /`
pub async fn root_handler() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        service: SERVICE_NAME,
        message: "Welcome to the image gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /healthz` - readiness probe, always 200.
pub async fn readiness_handler() -> Json<ProbeResponse> {
    Json(ProbeResponse { status: "ready" })
}

/// `GET /livez` - liveness probe, always 200.
pub async fn liveness_handler() -> Json<ProbeResponse> {
    Json(ProbeResponse { status: "alive" })
}

/// `GET /ping`
pub async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        service: SERVICE_NAME,
    })
}

/// `GET /metrics` - text exposition format.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::internal(format!("Failed to render metrics: {}", e)))?;

    Ok((
        [(header::CONTENT_TYPE, state.metrics.content_type())],
        body,
    )
        .into_response())
}

// =============================================================================
// Account Handlers
// =============================================================================

/// Credentials from a JSON body; anything unparseable counts as missing.
fn credentials_from(body: Result<Json<Credentials>, JsonRejection>) -> Credentials {
    match body {
        Ok(Json(credentials)) => credentials,
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable credentials body");
            Credentials::default()
        }
    }
}

/// `POST /register`
///
/// - `201 Created` on success
/// - `400` missing fields, `409` existing user, `500` otherwise
pub async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let credentials = credentials_from(body);
    state.registrar.register(&credentials).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// `POST /login`
///
/// - `200` with `{token}` on success
/// - `400` missing fields, `401` invalid credentials, `500` auth service unavailable
pub async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let credentials = credentials_from(body);
    let token = state.credentials.login(&credentials).await?;
    Ok(Json(token))
}

/// `GET /private` - 200 when the token verifies, 401 otherwise.
pub async fn private_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    state.credentials.verify(bearer_token(&headers)).await?;

    Ok(Json(MessageResponse {
        message: "Access granted".to_string(),
    }))
}

/// `GET /auth/verify` - `{status: "success", user}` or 401.
pub async fn verify_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResultResponse>, ApiError> {
    let identity = state.credentials.verify(bearer_token(&headers)).await?;

    Ok(Json(VerifyResultResponse {
        status: "success",
        user: identity.user,
    }))
}

// =============================================================================
// Image Handlers
// =============================================================================

/// `POST /upload` - multipart field `file`.
///
/// - `200` with `{message, filename, url}`
/// - `400` no file, `401` missing token
/// - image service status (or 500) when forwarding fails
pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let token = bearer_token(&headers).ok_or(UploadError::MissingToken)?;
    let multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection, "Upload without multipart body");
        UploadError::MissingFile
    })?;

    let uploaded = state.uploads.relay(Some(token), multipart).await?;

    Ok(Json(UploadResponse {
        message: "Uploaded successfully",
        filename: uploaded.filename,
        url: uploaded.url,
    }))
}

/// `GET /images/{filename}` - streams the image service's bytes.
///
/// Content type comes from the image service, then the extension table.
pub async fn image_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;

    let image = state
        .images
        .fetch(&filename, token)
        .await
        .map_err(|e| {
            warn!(filename = %filename, error = %e, "Image fetch failed");
            ApiError::from_backend(&e, "Failed to fetch image")
        })?;

    let content_type = resolve_content_type(image.content_type.as_deref(), &filename);
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition =
        HeaderValue::from_str(&format!("inline; filename=\"{}\"", filename.replace('"', "")))
            .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(image.body))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

/// `GET /images` - HTML gallery for the caller's token.
///
/// - `401` missing token or token rejected by the image service
/// - `500` any other listing failure
pub async fn gallery_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;

    let html = state.gallery.render(token).await.map_err(|e| {
        if e.status() == Some(StatusCode::UNAUTHORIZED) {
            ApiError::InvalidToken("Invalid token".to_string())
        } else {
            ApiError::internal("Failed to fetch images")
        }
    })?;

    Ok(Html(html))
}

/// `GET /api/images` - JSON listing; the token is forwarded only if present.
pub async fn list_images_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ImageDescriptor>>, ApiError> {
    let images = state
        .images
        .list(bearer_token(&headers))
        .await
        .map_err(|e| {
            error!(error = %e, "Image listing failed");
            ApiError::from_backend(&e, "Failed to fetch images")
        })?;

    Ok(Json(images))
}

/// `POST /api/images/upload` - JSON body relayed to the image service.
pub async fn legacy_upload_handler(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<UploadReceipt>, ApiError> {
    let payload = body
        .map(|Json(value)| value)
        .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));

    let receipt = state.images.upload_json(&payload).await.map_err(|e| {
        error!(error = %e, "Legacy upload failed");
        ApiError::internal("Upload failed")
    })?;

    Ok(Json(receipt))
}

// =============================================================================
// Last-Resort Handlers
// =============================================================================

/// JSON 404 for unknown routes.
pub async fn fallback_handler(uri: Uri) -> Response {
    let path = uri.path().to_string();
    debug!(path = %path, "No route matched");
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::with_path("Not found", path)),
    )
        .into_response()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Turn a panicking handler into a 500 that echoes the request path.
pub async fn catch_panic(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            error!(path = %path, panic = %panic_message(panic.as_ref()), "Handler panicked");
            ApiError::Internal {
                message: "Internal server error".to_string(),
                path: Some(path),
            }
            .into_response()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
