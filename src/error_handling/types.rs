//! Error type definitions.
//!
//! This module defines the error enums surfaced by the library and the
//! error/info categories counted while aggregating feeds.

use std::path::PathBuf;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// The catalog could not be loaded.
    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    /// The affiliate record store could not be opened.
    #[error("Affiliate store error: {0}")]
    AffiliateStoreError(#[from] AffiliateError),
}

/// Errors raised by affiliate code handling.
///
/// Surfaced to API callers: `InvalidCodeFormat` maps to 400,
/// `CodeAlreadyExists` to 409 and `InvalidCredentials` to 401.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AffiliateError {
    /// The code is not 3-20 characters of `[A-Za-z0-9_-]`.
    #[error("Invalid affiliate code format: {0:?} (expected 3-20 characters of letters, digits, '_' or '-')")]
    InvalidCodeFormat(String),

    /// A code with the same spelling is already registered (or reserved).
    #[error("Affiliate code already exists: {0}")]
    CodeAlreadyExists(String),

    /// The code is unknown or the secret does not match.
    #[error("Invalid credentials for affiliate code {0}")]
    InvalidCredentials(String),

    /// Reading or writing the affiliate record file failed.
    #[error("Affiliate record store failure: {0}")]
    StoreFailure(String),
}

/// Failures fetching a single feed.
///
/// These never reach end users: the aggregator records them and treats the
/// feed as an empty contribution.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The request could not be sent or its body could not be read.
    #[error("Upstream fetch failure for {url}: {source}")]
    UpstreamFetchFailure {
        url: String,
        #[source]
        source: ReqwestError,
    },

    /// The feed answered with a non-2xx status.
    #[error("Upstream {url} returned HTTP {status}")]
    UpstreamStatus { url: String, status: u16 },

    /// The feed did not answer within the per-feed timeout.
    #[error("Upstream {url} timed out after {timeout_ms}ms")]
    UpstreamTimeout { url: String, timeout_ms: u128 },

    /// The body is not JSON.
    #[error("Upstream {url} returned invalid JSON: {source}")]
    UpstreamDecode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The body is JSON but not a reseller document.
    #[error("Malformed feed shape from {url}: {reason}")]
    MalformedFeedShape { url: String, reason: String },
}

/// Errors reading or writing the aggregate cache file.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache file could not be read or written.
    #[error("Cache persistence failure at {}: {source}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file exists but does not hold a valid cache document.
    #[error("Cache file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The cache could not be serialized.
    #[error("Cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors loading or validating the catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("Failed to read catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid JSON for the catalog schema.
    #[error("Failed to parse catalog {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The catalog defines no profiles.
    #[error("Catalog defines no profiles")]
    NoProfiles,

    /// Two profiles share a name.
    #[error("Duplicate catalog profile: {0}")]
    DuplicateProfile(String),

    /// `default_profile` names a profile that does not exist.
    #[error("Default profile {0:?} is not defined")]
    UnknownDefaultProfile(String),

    /// A reseller pattern cannot be applied.
    #[error("Invalid pattern for reseller {reseller}: {reason}")]
    InvalidPattern { reseller: String, reason: String },
}

/// Categorized failures counted while aggregating feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // Feed transport errors
    FeedTimeoutError,
    FeedConnectError,
    FeedRequestError,
    FeedBodyError,
    FeedTooManyRequests,
    FeedClientError,
    FeedServerError,
    FeedOtherError,
    // Feed content errors
    FeedInvalidJson,
    FeedMalformedShape,
    // Cache file errors
    CachePersistenceFailure,
    CacheCorrupt,
}

/// Informational events counted while serving data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    CacheHit,
    CacheRefresh,
    FeedFetched,
    BatchTimeout,
    /// Reseller or product value in a feed that is not an object
    EntrySkipped,
    /// Product not in the profile's allow-list
    UnknownProductDropped,
    /// Duration without a price or a URL
    DurationDropped,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::FeedTimeoutError => "Feed timeout",
            ErrorType::FeedConnectError => "Feed connect error",
            ErrorType::FeedRequestError => "Feed request error",
            ErrorType::FeedBodyError => "Feed body error",
            ErrorType::FeedTooManyRequests => "Feed rate limited (429)",
            ErrorType::FeedClientError => "Feed client error (4xx)",
            ErrorType::FeedServerError => "Feed server error (5xx)",
            ErrorType::FeedOtherError => "Feed other error",
            ErrorType::FeedInvalidJson => "Feed invalid JSON",
            ErrorType::FeedMalformedShape => "Feed malformed shape",
            ErrorType::CachePersistenceFailure => "Cache persistence failure",
            ErrorType::CacheCorrupt => "Cache file corrupt",
        }
    }

    /// Label used for this category in `/metrics` and `/status`.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorType::FeedTimeoutError => "feed_timeout",
            ErrorType::FeedConnectError => "feed_connect",
            ErrorType::FeedRequestError => "feed_request",
            ErrorType::FeedBodyError => "feed_body",
            ErrorType::FeedTooManyRequests => "feed_too_many_requests",
            ErrorType::FeedClientError => "feed_client_error",
            ErrorType::FeedServerError => "feed_server_error",
            ErrorType::FeedOtherError => "feed_other",
            ErrorType::FeedInvalidJson => "feed_invalid_json",
            ErrorType::FeedMalformedShape => "feed_malformed_shape",
            ErrorType::CachePersistenceFailure => "cache_persistence_failure",
            ErrorType::CacheCorrupt => "cache_corrupt",
        }
    }
}

impl InfoType {
    /// Label used for this event in `/metrics` and `/status`.
    pub fn label(&self) -> &'static str {
        match self {
            InfoType::CacheHit => "cache_hit",
            InfoType::CacheRefresh => "cache_refresh",
            InfoType::FeedFetched => "feed_fetched",
            InfoType::BatchTimeout => "batch_timeout",
            InfoType::EntrySkipped => "entry_skipped",
            InfoType::UnknownProductDropped => "unknown_product_dropped",
            InfoType::DurationDropped => "duration_dropped",
        }
    }
}

impl FeedError {
    /// URL of the feed that failed.
    pub fn url(&self) -> &str {
        match self {
            FeedError::UpstreamFetchFailure { url, .. }
            | FeedError::UpstreamStatus { url, .. }
            | FeedError::UpstreamTimeout { url, .. }
            | FeedError::UpstreamDecode { url, .. }
            | FeedError::MalformedFeedShape { url, .. } => url,
        }
    }
}

impl CacheError {
    /// Category this failure is counted under.
    pub fn error_type(&self) -> ErrorType {
        match self {
            CacheError::Corrupt { .. } => ErrorType::CacheCorrupt,
            CacheError::PersistenceFailure { .. } | CacheError::Serialize(_) => {
                ErrorType::CachePersistenceFailure
            }
        }
    }
}
