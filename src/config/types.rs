//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    CACHE_DURATION, DEFAULT_AFFILIATE_CODE, DEFAULT_BIND_ADDR, DEFAULT_DATA_DIR,
    DEFAULT_PUBLIC_BASE_URL, DEFAULT_USER_AGENT, FEED_BATCH_TIMEOUT_SECS, FEED_TIMEOUT_SECS,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// This is the core configuration struct used by the library. It can be
/// constructed programmatically without any CLI dependencies.
///
/// # Examples
///
/// ```no_run
/// use affiliate_hub::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     data_dir: PathBuf::from("/var/lib/affiliate_hub"),
///     cache_ttl_secs: 600,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on
    pub bind: SocketAddr,

    /// Catalog file (profiles, feeds, reseller patterns); built-in catalog when `None`
    pub catalog: Option<PathBuf>,

    /// Directory holding cache files and affiliate records
    pub data_dir: PathBuf,

    /// Aggregate cache time-to-live in seconds
    pub cache_ttl_secs: u64,

    /// Per-feed fetch timeout in seconds
    pub feed_timeout_secs: u64,

    /// Timeout for a whole refresh batch in seconds
    pub batch_timeout_secs: u64,

    /// Affiliate code used when a request carries none
    pub default_affiliate_code: String,

    /// Public base URL used to build shareable affiliate links
    pub public_base_url: String,

    /// HTTP User-Agent header value for feed requests
    pub user_agent: String,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Cache TTL as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Per-feed timeout as a `Duration`.
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    /// Batch timeout as a `Duration`.
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080))),
            catalog: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cache_ttl_secs: CACHE_DURATION.as_secs(),
            feed_timeout_secs: FEED_TIMEOUT_SECS,
            batch_timeout_secs: FEED_BATCH_TIMEOUT_SECS,
            default_affiliate_code: DEFAULT_AFFILIATE_CODE.to_string(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

/// Command-line options.
///
/// Every option can also be supplied through the environment (including a
/// `.env` file), e.g. `AFFILIATE_HUB_CACHE_TTL_SECS=600`.
///
/// # Examples
///
/// ```bash
/// # Serve with the built-in catalog
/// affiliate_hub
///
/// # Custom catalog, data directory and default code
/// affiliate_hub --catalog catalog.json --data-dir /var/lib/affiliate_hub \
///     --default-affiliate-code keyempire
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "affiliate_hub",
    about = "Serves reseller offers with affiliate-tagged purchase links."
)]
pub struct Opt {
    /// Address to listen on
    #[arg(long, env = "AFFILIATE_HUB_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: SocketAddr,

    /// Catalog file (JSON) describing profiles, feeds and reseller patterns
    #[arg(long, env = "AFFILIATE_HUB_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Directory for cache files and affiliate records
    #[arg(long, env = "AFFILIATE_HUB_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Aggregate cache TTL in seconds
    #[arg(long, env = "AFFILIATE_HUB_CACHE_TTL_SECS", default_value_t = CACHE_DURATION.as_secs())]
    pub cache_ttl_secs: u64,

    /// Per-feed fetch timeout in seconds
    #[arg(long, env = "AFFILIATE_HUB_FEED_TIMEOUT_SECS", default_value_t = FEED_TIMEOUT_SECS)]
    pub feed_timeout_secs: u64,

    /// Timeout for a whole refresh batch in seconds
    #[arg(long, env = "AFFILIATE_HUB_BATCH_TIMEOUT_SECS", default_value_t = FEED_BATCH_TIMEOUT_SECS)]
    pub batch_timeout_secs: u64,

    /// Affiliate code used when a request carries none
    #[arg(long, env = "AFFILIATE_HUB_DEFAULT_CODE", default_value = DEFAULT_AFFILIATE_CODE)]
    pub default_affiliate_code: String,

    /// Public base URL used to build shareable affiliate links
    #[arg(long, env = "AFFILIATE_HUB_PUBLIC_BASE_URL", default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    /// HTTP User-Agent header value for feed requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl From<Opt> for Config {
    fn from(opt: Opt) -> Self {
        Self {
            bind: opt.bind,
            catalog: opt.catalog,
            data_dir: opt.data_dir,
            cache_ttl_secs: opt.cache_ttl_secs,
            feed_timeout_secs: opt.feed_timeout_secs,
            batch_timeout_secs: opt.batch_timeout_secs,
            default_affiliate_code: opt.default_affiliate_code,
            public_base_url: opt.public_base_url,
            user_agent: opt.user_agent,
            log_level: opt.log_level,
            log_format: opt.log_format,
        }
    }
}
