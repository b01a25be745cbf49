use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::api::{self, AppState};
use super::auth::AccessPolicy;
use super::db::{BoardDb, DbHandle};
use crate::config::CivicConfig;
use crate::estimate::Estimator;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
    pub policy: AccessPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            db_path: PathBuf::from(".civic/civic.db"),
            dev_mode: false,
            policy: AccessPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_config(config: &CivicConfig) -> Self {
        let server = config.server();
        Self {
            host: server.host.clone(),
            port: server.port,
            db_path: server.db_path.clone(),
            dev_mode: server.dev,
            policy: config.access_policy(),
        }
    }
}

/// Build the full application router: API routes, JSON 404s, request tracing.
pub fn build_router(state: Arc<AppState>, dev_mode: bool) -> Router {
    let app = api::api_router()
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if dev_mode {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Not found"})),
    )
}

/// Open (and migrate) the board database, creating its directory if needed.
pub fn open_db(db_path: &Path, policy: AccessPolicy) -> Result<BoardDb> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = BoardDb::new(db_path).context("Failed to initialize board database")?;
    Ok(db.with_policy(policy))
}

/// Start the board server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig, estimator: Arc<dyn Estimator>) -> Result<()> {
    let db = open_db(&config.db_path, config.policy)?;
    if !estimator.is_configured() {
        info!("OPENAI_API_KEY not set; /api/summarize will report it as missing");
    }

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        estimator,
    });
    let app = build_router(state, config.dev_mode);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        addr = %local_addr,
        db = %config.db_path.display(),
        dev = config.dev_mode,
        anonymous_writes = config.policy.allow_anonymous_writes,
        "civic-hero listening"
    );
    println!("civic-hero running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
