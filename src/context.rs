//! Process-wide gateway context.
//!
//! Built once at startup from [`Config`]; owns the shared HTTP connection
//! pool, the collaborator clients, the optional user store and the metrics
//! registry. Handlers only see the [`AppState`] derived from it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{HttpAuthClient, HttpImageClient};
use crate::config::Config;
use crate::error::StoreError;
use crate::server::{AppState, HttpMetrics};
use crate::upload::UploadRelay;
use crate::users::{PgUserStore, Registrar};

/// Failures while assembling the context.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to prepare staging directory: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Failed to configure user store: {0}")]
    UserStore(#[from] StoreError),
}

/// Shared dependencies of the running gateway.
#[derive(Clone)]
pub struct GatewayContext {
    pub config: Arc<Config>,
    pub auth: Arc<HttpAuthClient>,
    pub images: Arc<HttpImageClient>,
    /// None when no database is configured
    pub users: Option<Arc<PgUserStore>>,
    pub metrics: Arc<HttpMetrics>,
    pub uploads: UploadRelay,
}

impl GatewayContext {
    /// Assemble every component from the configuration.
    ///
    /// Nothing here contacts a collaborator; the database pool connects
    /// lazily on first registration.
    pub fn from_config(config: Config) -> Result<Self, StartupError> {
        let http = reqwest::Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        let auth = Arc::new(HttpAuthClient::new(
            http.clone(),
            config.auth_service_url.clone(),
            config.login_timeout(),
            config.auth_timeout(),
        ));
        let images = Arc::new(HttpImageClient::new(
            http,
            config.image_service_url.clone(),
            config.image_timeout(),
            config.upload_timeout(),
        ));

        let users = match config.database_url.as_deref() {
            Some(url) => Some(Arc::new(PgUserStore::connect_lazy(url)?)),
            None => {
                warn!("DATABASE_URL not set; /register will fail");
                None
            }
        };

        let metrics = Arc::new(HttpMetrics::new()?);
        let uploads = UploadRelay::new(
            images.clone(),
            config.staging_dir(),
            config.public_base_url(),
        )?;

        Ok(Self {
            config: Arc::new(config),
            auth,
            images,
            users,
            metrics,
            uploads,
        })
    }

    /// Handler state backed by this context.
    pub fn app_state(&self) -> AppState {
        let state = AppState::new(
            self.auth.clone(),
            self.images.clone(),
            self.uploads.clone(),
            self.metrics.clone(),
        );

        match &self.users {
            Some(store) => state.with_registrar(Registrar::new(store.clone())),
            None => state,
        }
    }

    /// Release pooled resources after the server has stopped.
    pub async fn shutdown(&self) {
        if let Some(store) = &self.users {
            store.close().await;
            info!("User store connections closed");
        }
        info!(
            requests = self.metrics.total_requests(),
            "Gateway context shut down"
        );
    }
}
