//! HTTP API server.
//!
//! Routes:
//! - `/api/{profile}/resellers[/{product}|/batch]` - aggregated reseller data
//! - `/api/affiliate/*` and `/affiliate/{code}` - attribution and code management
//! - `/status` and `/metrics` - monitoring
//!
//! Every response that resolved an explicit affiliate code carries a
//! `Set-Cookie` header persisting it.

mod handlers;
mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::marketplace::Marketplace;
use handlers::{
    all_resellers_handler, batch_handler, generate_handler, landing_handler, metrics_handler,
    product_resellers_handler, resolve_handler, status_handler, verify_handler,
};
pub use types::{ApiError, AppState};

/// Builds the API router over `marketplace`.
pub fn build_router(marketplace: Arc<Marketplace>) -> Router {
    Router::new()
        .route("/api/{profile}/resellers", get(all_resellers_handler))
        .route("/api/{profile}/resellers/batch", post(batch_handler))
        .route(
            "/api/{profile}/resellers/{product}",
            get(product_resellers_handler),
        )
        .route("/api/affiliate/resolve", get(resolve_handler))
        .route("/api/affiliate/generate", post(generate_handler))
        .route("/api/affiliate/verify", get(verify_handler))
        .route("/affiliate/{code}", get(landing_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(AppState::new(marketplace))
}

/// Serves the API on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    marketplace: Arc<Marketplace>,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr = listener.local_addr()?;
    log::info!("Affiliate hub listening on http://{}/", addr);
    log::info!("  - Resellers: http://{}/api/{}/resellers", addr, marketplace.default_profile());
    log::info!("  - Status: http://{}/status", addr);
    log::info!("  - Metrics: http://{}/metrics", addr);

    axum::serve(listener, build_router(marketplace))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    log::info!("Server stopped");
    Ok(())
}
