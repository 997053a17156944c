//! # Health Server
//!
//! Serves `GET /health` with `200 OK` so container orchestrators can check
//! the daemon. The server runs as its own task, independent of cycles, and
//! drains gracefully once the shared cancellation token fires.

use axum::{Router, routing::get};
use ddns_core::CancellationToken;
use tokio::net::TcpListener;
use tracing::info;

/// Router with the liveness endpoint
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}

/// Serve until `cancel` fires
pub async fn serve(listener: TcpListener, cancel: CancellationToken) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Health server listening");
    }

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
