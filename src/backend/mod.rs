//! Collaborator clients.
//!
//! The gateway talks to two independently deployed services: the auth service
//! (login and token verification) and the image service (listing, retrieval,
//! upload). Components never hold a concrete client; they go through the
//! [`AuthClient`] and [`ImageClient`] traits so tests can substitute
//! in-memory collaborators.
//!
//! ```text
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │   CredentialForwarder    │   │ UploadRelay / Gallery    │
//! └────────────┬─────────────┘   └────────────┬─────────────┘
//!              ▼                              ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │    AuthClient (trait)    │   │   ImageClient (trait)    │
//! │    └ HttpAuthClient      │   │   └ HttpImageClient      │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```

mod auth;
mod image;

pub use auth::HttpAuthClient;
pub use image::{content_type_for_extension, resolve_content_type, HttpImageClient};

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

// =============================================================================
// Wire Types
// =============================================================================

/// Username/password pair forwarded to the auth service.
///
/// `Debug` redacts the password so the value can sit in spans safely.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields are present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login payload from the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Verification payload from the auth service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyResponse {
    /// `"true"` (or `true`) when the token is valid
    #[serde(default)]
    pub valid: Option<serde_json::Value>,

    /// Identity bound to the token, when the auth service reports it
    #[serde(default)]
    pub user: Option<String>,
}

impl VerifyResponse {
    /// Only an explicit `"true"` (or `true`) accepts the token.
    pub fn is_valid(&self) -> bool {
        match &self.valid {
            None => false,
            Some(serde_json::Value::Bool(valid)) => *valid,
            Some(serde_json::Value::String(valid)) => valid == "true",
            Some(_) => false,
        }
    }
}

/// One entry of the image service listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    #[serde(alias = "key", alias = "name")]
    pub filename: String,

    /// Size in bytes
    #[serde(default)]
    pub size: u64,

    #[serde(default, alias = "lastModified", alias = "last_modified_at")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Listing bodies accepted from the image service.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListingBody {
    Bare(Vec<ImageDescriptor>),
    Wrapped { images: Vec<ImageDescriptor> },
}

impl ListingBody {
    pub(crate) fn into_descriptors(self) -> Vec<ImageDescriptor> {
        match self {
            ListingBody::Bare(images) | ListingBody::Wrapped { images } => images,
        }
    }
}

/// Acknowledgement returned by the image service after an upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Name assigned by the image service
    pub filename: String,
}

/// Stream of file bytes sent to the image service.
pub type UploadStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A file re-packaged for the image service's multipart upload endpoint.
pub struct UploadPart {
    pub file_name: String,
    pub content_type: Option<String>,
    /// Exact number of bytes `body` yields
    pub length: u64,
    pub body: UploadStream,
}

impl UploadPart {
    /// Wrap an already-buffered payload.
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.into(),
            content_type,
            length: data.len() as u64,
            body: stream::once(async move { Ok(data) }).boxed(),
        }
    }

    /// Drain the body into a single buffer.
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        Ok(Bytes::from(chunks.concat()))
    }
}

impl fmt::Debug for UploadPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadPart")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Stream of image bytes as received from the image service.
pub type ImageStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// Image bytes plus the content type the image service reported.
pub struct ImageData {
    pub content_type: Option<String>,
    pub body: ImageStream,
}

impl ImageData {
    /// Wrap an already-buffered payload.
    pub fn from_bytes(content_type: Option<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            content_type,
            body: stream::once(async move { Ok(data) }).boxed(),
        }
    }

    /// Drain the stream into a single buffer.
    pub async fn into_bytes(self) -> Result<Bytes, BackendError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        Ok(Bytes::from(chunks.concat()))
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Transport to the auth service.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// `POST /login` with the credentials as JSON.
    async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, BackendError>;

    /// `GET /verify` with the token in the `Authorization` header.
    async fn verify(&self, token: &str) -> Result<VerifyResponse, BackendError>;
}

/// Transport to the image service.
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// `GET /list`, attaching the token only when one is given.
    async fn list(&self, token: Option<&str>) -> Result<Vec<ImageDescriptor>, BackendError>;

    /// `GET /images/{filename}`.
    async fn fetch(&self, filename: &str, token: &str) -> Result<ImageData, BackendError>;

    /// `POST /upload` with a single multipart `file` part.
    async fn upload(&self, part: UploadPart, token: &str) -> Result<UploadReceipt, BackendError>;

    /// `POST /upload` with an opaque JSON body (legacy passthrough).
    async fn upload_json(
        &self,
        payload: &serde_json::Value,
    ) -> Result<UploadReceipt, BackendError>;
}

// =============================================================================
// Shared HTTP Helpers
// =============================================================================

/// Join a base URL and an absolute path without doubling the slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Turn a non-2xx response into `BackendError::Status`, keeping the
/// collaborator's `detail` text when it sent one.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let detail = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(|d| d.as_str())
                .map(str::to_string)
        });

    Err(BackendError::Status {
        status: status.as_u16(),
        detail,
    })
}
