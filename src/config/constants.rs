//! Configuration constants.
//!
//! This module defines the constants used throughout the application,
//! including attribution cookie settings, cache and fetch timeouts, and
//! retry parameters for upstream feeds.

use std::time::Duration;

// Attribution
/// Name of the cookie (and persisted key) holding the attributed affiliate code
pub const AFFILIATE_COOKIE_NAME: &str = "affiliate_code";
/// Lifetime of the attribution cookie: 365 days
pub const AFFILIATE_COOKIE_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;
/// Query parameters carrying an explicit affiliate code, highest precedence first
pub const AFFILIATE_QUERY_PARAMS: &[&str] = &["affiliate", "ref"];
/// Path prefix of the `/affiliate/{code}` landing form
pub const AFFILIATE_PATH_PREFIX: &str = "/affiliate/";
/// Page visitors land on after the `/affiliate/{code}` form has been recorded
pub const AFFILIATE_REDIRECT_TARGET: &str = "/";
/// Delay before the landing page redirects to [`AFFILIATE_REDIRECT_TARGET`]
pub const AFFILIATE_REDIRECT_DELAY_SECS: u64 = 2;
/// Code used when no other source supplies one.
///
/// Every entry point reads the configured default (see `Config::default_affiliate_code`);
/// this is only the value used when nothing is configured.
pub const DEFAULT_AFFILIATE_CODE: &str = "voxlisnet";
/// Minimum affiliate code length
pub const AFFILIATE_CODE_MIN_LEN: usize = 3;
/// Maximum affiliate code length
pub const AFFILIATE_CODE_MAX_LEN: usize = 20;

// URL rewriting
/// Query parameter used for resellers without a registered pattern
pub const FALLBACK_REF_PARAM: &str = "ref";
/// Placeholder substituted by the affiliate code in path templates
pub const CODE_PLACEHOLDER: &str = "{code}";

// Aggregate cache
/// Default time-to-live of the aggregated reseller cache (5 minutes)
pub const CACHE_DURATION: Duration = Duration::from_secs(5 * 60);
/// Default directory holding cache files and affiliate records
pub const DEFAULT_DATA_DIR: &str = "./data";
/// File (inside the data directory) holding generated affiliate records
pub const ACCOUNTS_FILE: &str = "affiliates.json";

// Feed fetching
/// Per-feed fetch timeout in seconds (covers retries)
pub const FEED_TIMEOUT_SECS: u64 = 10;
/// Timeout for a whole refresh batch in seconds.
/// Feeds still outstanding when it fires contribute nothing to the refresh.
pub const FEED_BATCH_TIMEOUT_SECS: u64 = 15;
/// TCP connect timeout for feed requests in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default User-Agent string for feed requests.
///
/// Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Retry strategy
/// Initial delay in milliseconds before the first feed retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 250;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 2;
/// Maximum number of retries after the initial attempt
pub const RETRY_MAX_ATTEMPTS: usize = 2;

// Aggregation
/// Payment methods reported when nothing in a reseller entry hints at one
pub const DEFAULT_PAYMENTS: &[&str] = &["crypto", "paypal"];

// Affiliate generation
/// Length of the one-time secret handed out when a code is generated
pub const GENERATED_SECRET_LENGTH: usize = 24;

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

// Server
/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
/// Default public base URL used to build shareable affiliate links
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
