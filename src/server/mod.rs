//! HTTP server layer for the gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   metrics   │  │        routes           │  │
//! │  │ (requests)  │  │ (prometheus)│  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └──────────────┬──────────────────────────────┬───────────────────┘
//!                │                              │
//!        auth / users                 upload / gallery / backend
//! ```

pub mod handlers;
pub mod metrics;
pub mod routes;

pub use handlers::{bearer_token, AppState, ErrorResponse, SERVICE_NAME};
pub use metrics::HttpMetrics;
pub use routes::{create_router, RouterConfig};
