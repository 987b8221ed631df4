//! HTTP surface: scan control, progress and history.

use crate::config::Config;
use crate::scanner::Scanner;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tvshelf_db::pool::DbPool;

pub mod error;
pub mod routes_scan;
pub mod routes_sse;

pub use error::ApiError;

/// How long shutdown waits for cancelled scans to record their outcome.
const SCAN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub db_pool: DbPool,
    pub scanner: Scanner,
}

impl AppContext {
    pub fn new(config: Arc<Config>, db_pool: DbPool) -> Self {
        let scanner = Scanner::new(db_pool.clone(), config.clone());
        Self::with_scanner(config, db_pool, scanner)
    }

    pub fn with_scanner(config: Arc<Config>, db_pool: DbPool, scanner: Scanner) -> Self {
        Self {
            config,
            db_pool,
            scanner,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api",
            routes_scan::scan_routes().merge(routes_sse::sse_routes()),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "active_scans": ctx.scanner.active_scans(),
    }))
}

pub async fn start_server(config: Config, db_pool: DbPool) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(Arc::new(config), db_pool);
    let scanner = ctx.scanner.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drain_scans(&scanner).await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Cancel running scans and give them a moment to finalize.
async fn drain_scans(scanner: &Scanner) {
    let cancelled = scanner.cancel_all();
    if cancelled == 0 {
        return;
    }
    tracing::info!(scans = cancelled, "Cancelling running scans");

    let drained = tokio::time::timeout(SCAN_DRAIN_TIMEOUT, async {
        while !scanner.active_scans().is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Scans still running at shutdown; they will be failed on next start");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
