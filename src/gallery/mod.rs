//! Gallery rendering.
//!
//! Fetches the image listing, pulls every image in parallel, inlines each one
//! as a base64 data URI and renders a self-contained HTML page. A failed
//! fetch only affects its own entry, which is shown with a placeholder.

mod page;

pub use page::{html_escape, render_gallery_html};

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::backend::{resolve_content_type, ImageClient, ImageDescriptor};
use crate::error::BackendError;

/// One listed image, with its inlined bytes when the fetch succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub descriptor: ImageDescriptor,
    pub data_uri: Option<String>,
}

/// Builds the HTML gallery for a token.
#[derive(Clone)]
pub struct GalleryRenderer {
    client: Arc<dyn ImageClient>,
}

impl GalleryRenderer {
    pub fn new(client: Arc<dyn ImageClient>) -> Self {
        Self { client }
    }

    /// List images and fetch all of them concurrently.
    ///
    /// Fails only when the listing itself fails.
    pub async fn collect(&self, token: &str) -> Result<Vec<GalleryEntry>, BackendError> {
        let images = self.client.list(Some(token)).await?;
        debug!(count = images.len(), "Rendering gallery");

        let fetches = images.into_iter().map(|descriptor| async move {
            let data_uri = match self.inline(&descriptor.filename, token).await {
                Ok(uri) => Some(uri),
                Err(e) => {
                    warn!(filename = %descriptor.filename, error = %e, "Failed to inline image");
                    None
                }
            };
            GalleryEntry {
                descriptor,
                data_uri,
            }
        });

        Ok(join_all(fetches).await)
    }

    /// Render the full HTML document.
    pub async fn render(&self, token: &str) -> Result<String, BackendError> {
        let entries = self.collect(token).await?;
        Ok(render_gallery_html(&entries))
    }

    async fn inline(&self, filename: &str, token: &str) -> Result<String, BackendError> {
        let image = self.client.fetch(filename, token).await?;
        let content_type = resolve_content_type(image.content_type.as_deref(), filename);
        let bytes = image.into_bytes().await?;
        Ok(data_uri(&content_type, &bytes))
    }
}

/// `data:` URI for a payload.
pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, BASE64.encode(bytes))
}

/// Filename with the leading `{id}_` segment removed.
pub fn display_name(filename: &str) -> &str {
    match filename.split_once('_') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => filename,
    }
}

/// Size in kibibytes with two decimals.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}
