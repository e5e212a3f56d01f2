//! Error categorization and retry strategy.
//!
//! This module provides functions to categorize feed errors and configure retry strategies.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::{ErrorType, FeedError};
use crate::config::HTTP_STATUS_TOO_MANY_REQUESTS;

/// Creates an exponential backoff retry strategy for feed fetches.
///
/// Returns a retry strategy configured with:
/// - Initial delay: `RETRY_INITIAL_DELAY_MS` milliseconds
/// - Growth: each delay is `RETRY_FACTOR` times the previous one
/// - Maximum delay: `RETRY_MAX_DELAY_SECS` seconds
/// - Maximum retries: `RETRY_MAX_ATTEMPTS`
///
/// `ExponentialBackoff` yields `base^n * factor`, so the growth rate is the
/// base and the initial delay is folded into the factor.
///
/// The whole retry sequence still runs inside the per-feed timeout, so a slow
/// feed cannot extend a refresh by retrying.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(crate::config::RETRY_FACTOR)
        .factor(crate::config::RETRY_INITIAL_DELAY_MS / crate::config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
        .take(crate::config::RETRY_MAX_ATTEMPTS)
}

/// Categorizes an HTTP status returned by a feed.
pub fn categorize_status(status: u16) -> ErrorType {
    match status {
        HTTP_STATUS_TOO_MANY_REQUESTS => ErrorType::FeedTooManyRequests,
        400..=499 => ErrorType::FeedClientError,
        500..=599 => ErrorType::FeedServerError,
        _ => ErrorType::FeedOtherError,
    }
}

/// Categorizes a `reqwest::Error` into an `ErrorType`.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorType {
    if let Some(status) = error.status() {
        return categorize_status(status.as_u16());
    }

    if error.is_timeout() {
        ErrorType::FeedTimeoutError
    } else if error.is_connect() {
        ErrorType::FeedConnectError
    } else if error.is_request() {
        ErrorType::FeedRequestError
    } else if error.is_body() {
        ErrorType::FeedBodyError
    } else if error.is_decode() {
        ErrorType::FeedInvalidJson
    } else {
        ErrorType::FeedOtherError
    }
}

/// Categorizes a feed failure.
pub fn categorize_feed_error(error: &FeedError) -> ErrorType {
    match error {
        FeedError::UpstreamFetchFailure { source, .. } => categorize_reqwest_error(source),
        FeedError::UpstreamStatus { status, .. } => categorize_status(*status),
        FeedError::UpstreamTimeout { .. } => ErrorType::FeedTimeoutError,
        FeedError::UpstreamDecode { .. } => ErrorType::FeedInvalidJson,
        FeedError::MalformedFeedShape { .. } => ErrorType::FeedMalformedShape,
    }
}

/// Determines if a feed error is transient and worth retrying.
///
/// Timeouts, connection failures, 429 and 5xx responses are retried.
/// Other 4xx responses and content errors (invalid JSON, wrong shape) are not:
/// the same document would come back again.
pub fn is_retriable_feed_error(error: &FeedError) -> bool {
    match error {
        FeedError::UpstreamFetchFailure { source, .. } => {
            source.is_timeout() || source.is_connect() || source.is_request()
        }
        FeedError::UpstreamStatus { status, .. } => {
            *status == HTTP_STATUS_TOO_MANY_REQUESTS || (500..600).contains(status)
        }
        FeedError::UpstreamTimeout { .. } => true,
        FeedError::UpstreamDecode { .. } | FeedError::MalformedFeedShape { .. } => false,
    }
}
