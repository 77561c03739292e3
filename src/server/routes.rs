//! Router configuration for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! /                          - Service banner
//! /healthz, /livez           - Probes
//! /metrics                   - Prometheus metrics
//! /ping                      - Liveness ping
//! /register, /login          - Accounts
//! /private, /auth/verify     - Token checks
//! /upload                    - Multipart upload relay
//! /images                    - HTML gallery
//! /images/{filename}         - Image pass-through
//! /api/ping                  - Same as /ping
//! /api/auth/verify           - Same as /auth/verify
//! /api/images                - JSON listing
//! /api/images/upload         - JSON upload relay
//! ```
//!
//! # Example
//!
//! ```ignore
//! let router = create_router(state, RouterConfig::new().with_tracing(false));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    catch_panic, fallback_handler, gallery_handler, image_handler, legacy_upload_handler,
    list_images_handler, liveness_handler, login_handler, metrics_handler, ping_handler,
    private_handler, readiness_handler, register_handler, root_handler, upload_handler,
    verify_handler, AppState,
};
use super::metrics::track_metrics;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Any CORS origin, tracing enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Metrics are recorded for every request, labelled by matched route or
/// `<unmatched>` for the fallback. A panicking handler answers 500 with the
/// request path, and unknown paths get a JSON 404.
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    let metrics = state.metrics.clone();
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(readiness_handler))
        .route("/livez", get(liveness_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ping", get(ping_handler))
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/private", get(private_handler))
        .route("/auth/verify", get(verify_handler))
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::disable()),
        )
        .route("/images", get(gallery_handler))
        .route("/images/{filename}", get(image_handler))
        .nest("/api", api_routes())
        .fallback(fallback_handler)
        .layer(middleware::from_fn(catch_panic))
        .layer(middleware::from_fn_with_state(metrics, track_metrics))
        .layer(cors)
        .with_state(state);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Routes mounted under `/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/auth/verify", get(verify_handler))
        .route("/images", get(list_images_handler))
        .route(
            "/images/upload",
            post(legacy_upload_handler).layer(DefaultBodyLimit::disable()),
        )
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
