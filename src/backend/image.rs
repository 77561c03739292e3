//! HTTP implementation of [`ImageClient`] and content-type resolution.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::{
    check_status, endpoint, ImageClient, ImageData, ImageDescriptor, ListingBody, UploadPart,
    UploadReceipt,
};
use crate::error::BackendError;

/// Fallback when neither the image service nor the extension tells us.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// MIME type for a filename's extension, if it is a known image type.
pub fn content_type_for_extension(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

/// Prefer the reported content type, then the extension table, then a
/// generic binary type.
pub fn resolve_content_type(reported: Option<&str>, filename: &str) -> String {
    reported
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .map(str::to_string)
        .or_else(|| content_type_for_extension(filename).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Image service client backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpImageClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    upload_timeout: Duration,
}

impl HttpImageClient {
    /// # Arguments
    /// * `client` - Shared HTTP client (connection pool)
    /// * `base_url` - Image service base URL, e.g. `http://image-service:5000`
    /// * `timeout` - Timeout for listing and retrieval
    /// * `upload_timeout` - Timeout for uploads
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        timeout: Duration,
        upload_timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
            upload_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ImageClient for HttpImageClient {
    async fn list(&self, token: Option<&str>) -> Result<Vec<ImageDescriptor>, BackendError> {
        let mut request = self
            .client
            .get(endpoint(&self.base_url, "/list"))
            .timeout(self.timeout);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, token);
        }

        let response = check_status(request.send().await?).await?;
        let body = response.bytes().await?;
        let listing: ListingBody = serde_json::from_slice(&body)
            .map_err(|e| BackendError::InvalidResponse(format!("image listing: {}", e)))?;

        let images = listing.into_descriptors();
        debug!(count = images.len(), "Fetched image listing");
        Ok(images)
    }

    async fn fetch(&self, filename: &str, token: &str) -> Result<ImageData, BackendError> {
        let path = format!("/images/{}", urlencoding::encode(filename));

        let response = self
            .client
            .get(endpoint(&self.base_url, &path))
            .header(AUTHORIZATION, token)
            .timeout(self.timeout)
            .send()
            .await?;
        let response = check_status(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes_stream().map_err(BackendError::from).boxed();

        Ok(ImageData { content_type, body })
    }

    async fn upload(&self, part: UploadPart, token: &str) -> Result<UploadReceipt, BackendError> {
        let mut file_part =
            Part::stream_with_length(reqwest::Body::wrap_stream(part.body), part.length)
                .file_name(part.file_name);
        if let Some(ref content_type) = part.content_type {
            file_part = file_part
                .mime_str(content_type)
                .map_err(|e| BackendError::Connection(format!("invalid content type: {}", e)))?;
        }
        let form = Form::new().part("file", file_part);

        let response = self
            .client
            .post(endpoint(&self.base_url, "/upload"))
            .header(AUTHORIZATION, token)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await?;

        let receipt = check_status(response).await?.json::<UploadReceipt>().await?;
        Ok(receipt)
    }

    async fn upload_json(
        &self,
        payload: &serde_json::Value,
    ) -> Result<UploadReceipt, BackendError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/upload"))
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await?;

        let receipt = check_status(response).await?.json::<UploadReceipt>().await?;
        Ok(receipt)
    }
}
