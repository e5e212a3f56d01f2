//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `affiliate_hub` library that handles:
//! - Environment variable loading (.env file)
//! - Command-line argument parsing
//! - Logger initialization
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use affiliate_hub::initialization::init_logger_with;
use affiliate_hub::{run_server, Config, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine: every option has a CLI flag and a default
    let _ = dotenvy::dotenv();

    let config = Config::from(Opt::parse());

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run_server(config).await {
        eprintln!("affiliate_hub error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
