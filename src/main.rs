//! Image Gateway - HTTP front door for the auth and image services.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_gateway::{create_router, Config, GatewayContext, RouterConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Image Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Auth service: {}", config.auth_service_url);
    info!("  Image service: {}", config.image_service_url);
    info!("  Public base URL: {}", config.public_base_url());
    info!("  Upload staging: {}", config.staging_dir().display());
    info!(
        "  Timeouts: verify {}ms, login {}ms, image {}ms, upload {}ms",
        config.auth_timeout_ms,
        config.login_timeout_ms,
        config.image_timeout_ms,
        config.upload_timeout_ms
    );
    if config.database_url.is_some() {
        info!("  User store: configured");
    } else {
        warn!("  User store: not configured (set DATABASE_URL to enable /register)");
    }

    let router_config = build_router_config(&config);
    let addr = config.bind_address();

    let context = match GatewayContext::from_config(config) {
        Ok(context) => context,
        Err(e) => {
            error!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(context.app_state(), router_config);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    context.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_gateway=debug,tower_http=debug"
    } else {
        "image_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
