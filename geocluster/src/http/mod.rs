//! HTTP adapter.
//!
//! A thin axum layer over [`ClusterApp`]:
//!
//! | Route               | Response                                              |
//! |---------------------|-------------------------------------------------------|
//! | `GET /clusters`     | `{count, clusters, cachedCount, storedCount, newCount}` |
//! | `GET /api/clusters` | alias of `/clusters`                                  |
//! | `GET /health`       | `{"status": "ok"}`                                    |
//! | `GET /stats`        | telemetry snapshot plus cache and store sizes         |
//!
//! Errors are returned as `{"error": reason}` with 400 for invalid or
//! oversized queries, 503 when the connection pool is exhausted, 504 when
//! the request deadline passes and 500 for store or engine failures.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::ClusterApp;

pub use error::ApiError;
pub use handlers::parse_request;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<ClusterApp>,
}

/// Builds the router.
pub fn router(app: Arc<ClusterApp>) -> Router {
    Router::new()
        .route("/clusters", get(handlers::clusters))
        .route("/api/clusters", get(handlers::clusters))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .with_state(AppState { app })
}

/// Serves the router on `bind` until `shutdown` is cancelled.
pub async fn serve(
    bind: SocketAddr,
    app: Arc<ClusterApp>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
