//! # Image Gateway
//!
//! A thin HTTP gateway in front of an auth service and an image service.
//!
//! The gateway owns no image data and no sessions. It forwards credentials
//! and tokens to the auth service, relays uploads and image bytes to and from
//! the image service, and renders a small HTML gallery from the image
//! service's listing.
//!
//! ## Architecture
//!
//! - [`backend`] - Typed HTTP clients for the two collaborator services
//! - [`auth`] - Credential forwarding and token verification
//! - [`users`] - Account registration backed by Postgres
//! - [`upload`] - Multipart upload staging and relay
//! - [`gallery`] - HTML gallery rendering
//! - [`server`] - Axum routes, handlers and metrics
//! - [`context`] - Process-wide wiring of the above
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use image_gateway::{create_router, Config, GatewayContext, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::parse();
//!     let context = GatewayContext::from_config(config).unwrap();
//!     let router = create_router(context.app_state(), RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod gallery;
pub mod server;
pub mod upload;
pub mod users;

pub use auth::{CredentialForwarder, Identity};
pub use backend::{
    AuthClient, Credentials, HttpAuthClient, HttpImageClient, ImageClient, ImageData,
    ImageDescriptor, TokenResponse, UploadPart, UploadReceipt, UploadStream, VerifyResponse,
};
pub use config::Config;
pub use context::{GatewayContext, StartupError};
pub use error::{ApiError, AuthError, BackendError, RegisterError, StoreError, UploadError};
pub use gallery::{GalleryEntry, GalleryRenderer};
pub use server::{create_router, AppState, HttpMetrics, RouterConfig};
pub use upload::{RelayedUpload, StagedUpload, UploadRelay, UploadStage};
pub use users::{PgUserStore, Registrar, UserStore};
