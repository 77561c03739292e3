//! Upload relay.
//!
//! Accepts a multipart upload, stages the file on disk, re-packages it as
//! multipart and forwards it to the image service.
//!
//! # Lifecycle
//!
//! ```text
//! Received ──► Staged ──► Forwarding ──► Completed
//!                 │            │
//!                 │            └──────► Failed
//!                 ▼
//!              Cleanup   (entered from every state once staged)
//! ```
//!
//! The staged file lives in a uniquely named temporary file so concurrent
//! uploads never collide. [`StagedUpload::cleanup`] deletes it and logs the
//! outcome; a deletion failure is never reported to the caller.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::Multipart;
use futures_util::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use crate::backend::{ImageClient, UploadPart, UploadReceipt};
use crate::error::UploadError;

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Prefix for staged file names.
const STAGING_PREFIX: &str = "upload-";

/// Stages of a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Staged,
    Forwarding,
    Completed,
    Failed,
    Cleanup,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::Received => "received",
            UploadStage::Staged => "staged",
            UploadStage::Forwarding => "forwarding",
            UploadStage::Completed => "completed",
            UploadStage::Failed => "failed",
            UploadStage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// A file written to the staging area, owned by one request.
pub struct StagedUpload {
    file: Option<NamedTempFile>,
    path: PathBuf,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

impl StagedUpload {
    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file, logging the result.
    pub fn cleanup(mut self) {
        debug!(stage = %UploadStage::Cleanup, path = %self.path.display(), "Removing staged upload");
        if let Some(file) = self.file.take() {
            match file.close() {
                Ok(()) => debug!(path = %self.path.display(), "Staged upload removed"),
                Err(e) => error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to delete staged upload"
                ),
            }
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        // NamedTempFile removes itself on drop. Reached when staging aborts
        // part-way or a panic unwinds past `relay`.
        if self.file.is_some() {
            warn!(path = %self.path.display(), "Staged upload dropped without cleanup");
        }
    }
}

impl fmt::Debug for StagedUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedUpload")
            .field("path", &self.path)
            .field("original_name", &self.original_name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish()
    }
}

/// Result of a relayed upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedUpload {
    /// Name assigned by the image service
    pub filename: String,
    /// Caller-facing retrieval URL
    pub url: String,
}

/// Stages uploads and forwards them to the image service.
#[derive(Clone)]
pub struct UploadRelay {
    client: Arc<dyn ImageClient>,
    staging_dir: PathBuf,
    public_base_url: String,
}

impl UploadRelay {
    /// Create a relay, making sure the staging directory exists.
    pub fn new(
        client: Arc<dyn ImageClient>,
        staging_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> std::io::Result<Self> {
        let staging_dir = staging_dir.into();
        std::fs::create_dir_all(&staging_dir)?;

        Ok(Self {
            client,
            staging_dir,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Retrieval URL for a filename assigned by the image service.
    pub fn retrieval_url(&self, filename: &str) -> String {
        format!("{}/images/{}", self.public_base_url, filename)
    }

    /// Run one upload end to end.
    ///
    /// The token must be present; it is checked before the body is read.
    /// Once a file has been staged it is removed on every exit path.
    pub async fn relay(
        &self,
        token: Option<&str>,
        multipart: Multipart,
    ) -> Result<RelayedUpload, UploadError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(UploadError::MissingToken),
        };
        debug!(stage = %UploadStage::Received, "Upload received");

        let staged = self.stage(multipart).await?;
        info!(
            stage = %UploadStage::Staged,
            file = %staged.original_name,
            size = staged.size,
            "Upload staged"
        );

        let result = self.forward(&staged, token).await;
        match &result {
            Ok(receipt) => info!(
                stage = %UploadStage::Completed,
                filename = %receipt.filename,
                "Upload forwarded"
            ),
            Err(e) => warn!(stage = %UploadStage::Failed, error = %e, "Upload failed"),
        }
        staged.cleanup();

        let receipt = result?;
        Ok(RelayedUpload {
            url: self.retrieval_url(&receipt.filename),
            filename: receipt.filename,
        })
    }

    /// Write the single `file` part to a fresh temporary file.
    ///
    /// Fields other than `file` are drained and ignored. A second `file`
    /// part is rejected.
    pub async fn stage(&self, mut multipart: Multipart) -> Result<StagedUpload, UploadError> {
        let mut staged: Option<StagedUpload> = None;

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?
        {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            if staged.is_some() {
                // `staged` is dropped here, which deletes the first file
                return Err(UploadError::MultipleFiles);
            }

            let original_name = field.file_name().unwrap_or(FILE_FIELD).to_string();
            let content_type = field.content_type().map(str::to_string);

            let temp = tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempfile_in(&self.staging_dir)?;
            let path = temp.path().to_path_buf();
            let mut upload = StagedUpload {
                file: Some(temp),
                path,
                original_name,
                content_type,
                size: 0,
            };

            let mut out = tokio::fs::OpenOptions::new()
                .write(true)
                .open(&upload.path)
                .await?;
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| UploadError::Multipart(e.to_string()))?
            {
                out.write_all(&chunk).await?;
                upload.size += chunk.len() as u64;
            }
            out.flush().await?;

            staged = Some(upload);
        }

        staged.ok_or(UploadError::MissingFile)
    }

    /// Re-package a staged file and stream it to the image service.
    ///
    /// The file is read chunk by chunk while the request is sent, so memory
    /// use does not grow with the upload size.
    pub async fn forward(
        &self,
        staged: &StagedUpload,
        token: &str,
    ) -> Result<UploadReceipt, UploadError> {
        debug!(stage = %UploadStage::Forwarding, file = %staged.original_name, "Forwarding upload");

        let file = tokio::fs::File::open(staged.path()).await?;
        let part = UploadPart {
            file_name: staged.original_name.clone(),
            content_type: staged.content_type.clone(),
            length: staged.size,
            body: ReaderStream::new(file).boxed(),
        };

        Ok(self.client.upload(part, token).await?)
    }
}
