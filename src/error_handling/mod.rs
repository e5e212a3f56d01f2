//! Error handling and aggregation statistics.
//!
//! This module provides:
//! - Error type definitions (`thiserror` enums per concern)
//! - Feed failure categorization and the feed retry strategy
//! - Aggregation statistics tracking (errors and info events)
//!
//! Upstream failures are never surfaced to end users; they are categorized,
//! counted, logged, and degrade to empty results.

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    categorize_feed_error, categorize_reqwest_error, categorize_status, get_retry_strategy,
    is_retriable_feed_error,
};
pub use stats::FeedStats;
pub use types::{
    AffiliateError, CacheError, CatalogError, ErrorType, FeedError, InfoType,
    InitializationError,
};
