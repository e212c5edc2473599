//! Upload server implementation
//!
//! Axum HTTP server with a browser upload form and a JSON API.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use crate::config::ValidatorConfig;
use crate::excel::load_backend_validations;
use crate::types::RuleBook;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub config: ValidatorConfig,
    /// Reference rules, loaded once at startup and never modified
    pub rules: Arc<RuleBook>,
    pub stylesheet: Option<String>,
    pub logo: Option<Vec<u8>>,
}

impl AppState {
    pub fn new(config: ValidatorConfig, rules: RuleBook) -> Self {
        let stylesheet = config.stylesheet();
        let logo = config.logo_path.as_deref().and_then(read_logo);
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            rules: Arc::new(rules),
            stylesheet,
            logo,
        }
    }
}

fn read_logo(path: &Path) -> Option<Vec<u8>> {
    if !path.exists() {
        return None;
    }
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Cannot read logo {}: {}", path.display(), e);
            None
        }
    }
}

/// Build the router (separate from `run_api_server` so tests can drive it directly)
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Browser form
        .route("/", get(handlers::index))
        .route("/logo.png", get(handlers::logo))
        .route("/validate", post(handlers::validate_upload))
        // Health and info endpoints
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // JSON API
        .route("/api/v1/scopes", get(handlers::scopes))
        .route("/api/v1/validate", post(handlers::validate_path))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the upload server until Ctrl+C / SIGTERM
pub async fn run_api_server(config: ValidatorConfig) -> anyhow::Result<()> {
    let rules = load_backend_validations(&config.client_data_path)?;
    info!(
        "Loaded {} rules from {}",
        rules.rules.len(),
        config.validations_path().display()
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = Arc::new(AppState::new(config, rules));
    let app = build_router(state);

    info!("🔍 MyCarbon validator starting on http://{}", addr);
    info!("   Form: /, Upload: POST /validate");
    info!("   API: /api/v1/validate, /api/v1/scopes, /health, /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("MyCarbon validator shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received, stopping server...");
}
