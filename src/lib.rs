//! affiliate_hub library: affiliate attribution and reseller aggregation
//!
//! This library resolves which affiliate code a visitor is attributed to,
//! rewrites reseller purchase links so they carry that code, and aggregates
//! reseller offers from external JSON feeds behind a TTL cache.
//!
//! # Example
//!
//! ```no_run
//! use affiliate_hub::{run_server, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     catalog: Some(std::path::PathBuf::from("catalog.json")),
//!     data_dir: std::path::PathBuf::from("./data"),
//!     ..Default::default()
//! };
//!
//! run_server(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod affiliate;
pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod error_handling;
pub mod initialization;
mod marketplace;
pub mod registry;
pub mod rewrite;
pub mod server;

// Re-export public API
pub use affiliate::{AffiliateCode, AffiliateResolver, AttributionStore, CodeSource};
pub use aggregator::{Aggregator, AggregatorSettings};
pub use catalog::{Catalog, CatalogProfile};
pub use config::{Config, LogFormat, LogLevel, Opt};
pub use marketplace::Marketplace;
pub use registry::PatternRegistry;
pub use rewrite::rewrite_url;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

/// Builds every service from `config` and serves the HTTP API until Ctrl-C.
pub async fn run_server(config: Config) -> Result<(), anyhow::Error> {
    let marketplace = Arc::new(
        Marketplace::init(&config)
            .await
            .context("Failed to initialize services")?,
    );

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested");
        }
        signal.cancel();
    });

    server::serve(listener, marketplace, shutdown).await
}
