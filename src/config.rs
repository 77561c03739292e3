//! Configuration management for the image gateway.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables using the names the deployment already sets
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use image_gateway::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//!
//! println!("Listening on {}", config.bind_address());
//! println!("Auth service: {}", config.auth_service_url);
//! ```
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 3000)
//! - `AUTH_SERVICE_URL` - Base URL of the auth service (required)
//! - `IMAGE_SERVICE_URL` - Base URL of the image service (default: http://image-service:5000)
//! - `DATABASE_URL` - Postgres connection string used by `/register`
//! - `API_BASE_URL` - Public base URL used when building image links
//! - `UPLOAD_DIR` - Directory where uploads are staged before relaying
//! - `AUTH_TIMEOUT_MS` - Token verification timeout (default: 2000)
//! - `LOGIN_TIMEOUT_MS` - Login timeout (default: 3000)
//! - `IMAGE_TIMEOUT_MS` - Image listing/retrieval timeout (default: 2000)
//! - `UPLOAD_TIMEOUT_MS` - Image upload timeout (default: 3000)
//! - `CORS_ORIGINS` - Allowed CORS origins, comma separated

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default image service location inside the cluster.
pub const DEFAULT_IMAGE_SERVICE_URL: &str = "http://image-service:5000";

/// Default timeout for token verification calls.
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 2000;

/// Default timeout for login calls.
pub const DEFAULT_LOGIN_TIMEOUT_MS: u64 = 3000;

/// Default timeout for image listing and retrieval calls.
pub const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 2000;

/// Default timeout for image uploads.
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u64 = 3000;

/// Upper bound accepted for any collaborator timeout.
pub const MAX_TIMEOUT_MS: u64 = 60_000;

/// Directory name used under the system temp dir when `UPLOAD_DIR` is unset.
pub const DEFAULT_STAGING_DIR_NAME: &str = "image-gateway-uploads";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image Gateway - forwards auth and image requests to backend services.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Public base URL used to build retrieval links for uploaded images.
    ///
    /// Defaults to `http://localhost:{port}`.
    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: Option<String>,

    // =========================================================================
    // Collaborator Services
    // =========================================================================
    /// Base URL of the auth service.
    #[arg(long, env = "AUTH_SERVICE_URL")]
    pub auth_service_url: String,

    /// Base URL of the image service.
    #[arg(long, default_value = DEFAULT_IMAGE_SERVICE_URL, env = "IMAGE_SERVICE_URL")]
    pub image_service_url: String,

    /// Postgres connection string for user registration.
    ///
    /// When absent, `/register` answers with 500.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    // =========================================================================
    // Timeouts
    // =========================================================================
    /// Timeout for token verification calls, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_AUTH_TIMEOUT_MS, env = "AUTH_TIMEOUT_MS")]
    pub auth_timeout_ms: u64,

    /// Timeout for login calls, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_LOGIN_TIMEOUT_MS, env = "LOGIN_TIMEOUT_MS")]
    pub login_timeout_ms: u64,

    /// Timeout for image listing and retrieval, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_IMAGE_TIMEOUT_MS, env = "IMAGE_TIMEOUT_MS")]
    pub image_timeout_ms: u64,

    /// Timeout for image uploads, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_UPLOAD_TIMEOUT_MS, env = "UPLOAD_TIMEOUT_MS")]
    pub upload_timeout_ms: u64,

    // =========================================================================
    // Upload Staging
    // =========================================================================
    /// Directory where uploaded files are staged before being relayed.
    #[arg(long, env = "UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        if self.auth_service_url.trim().is_empty() {
            return Err(
                "Auth service URL is required. Set --auth-service-url or AUTH_SERVICE_URL"
                    .to_string(),
            );
        }
        check_url("auth service URL", &self.auth_service_url)?;
        check_url("image service URL", &self.image_service_url)?;

        if let Some(ref base) = self.api_base_url {
            check_url("API base URL", base)?;
        }

        for (name, value) in [
            ("auth_timeout_ms", self.auth_timeout_ms),
            ("login_timeout_ms", self.login_timeout_ms),
            ("image_timeout_ms", self.image_timeout_ms),
            ("upload_timeout_ms", self.upload_timeout_ms),
        ] {
            if value == 0 || value > MAX_TIMEOUT_MS {
                return Err(format!(
                    "{} must be between 1 and {} milliseconds",
                    name, MAX_TIMEOUT_MS
                ));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public base URL for generated links, without a trailing slash.
    pub fn public_base_url(&self) -> String {
        match self.api_base_url {
            Some(ref base) => base.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }

    /// Directory used to stage uploads.
    pub fn staging_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_STAGING_DIR_NAME))
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

fn check_url(name: &str, value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("Invalid {} '{}': {}", name, value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "Invalid {} '{}': unsupported scheme '{}'",
            name, value, other
        )),
    }
}

// =============================================================================
// Tests
// =============================================================================
