//! JSON status handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use strum::IntoEnumIterator;

use super::super::types::{AppState, CounterGroup, ProfileStatus, StatusResponse};
use crate::error_handling::{ErrorType, InfoType};

/// JSON status endpoint with per-profile cache state and counters
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let marketplace = &state.marketplace;
    let now = Utc::now();

    let profiles = marketplace
        .aggregators()
        .map(|aggregator| {
            let cache = aggregator.snapshot();
            ProfileStatus {
                name: aggregator.name().to_string(),
                feeds: aggregator.profile().feeds.len(),
                products: cache.product_count(),
                cache_age_seconds: cache.age(now).map(|age| age.as_secs_f64()),
                last_refresh: cache.last_updated,
                refreshes: aggregator.refresh_count(),
            }
        })
        .collect();

    let stats = &marketplace.stats;
    let errors = CounterGroup {
        total: stats.total_errors(),
        by_type: ErrorType::iter()
            .map(|e| (e.label(), stats.get_error_count(e)))
            .collect(),
    };
    let info = CounterGroup {
        total: InfoType::iter().map(|i| stats.get_info_count(i)).sum(),
        by_type: InfoType::iter()
            .map(|i| (i.label(), stats.get_info_count(i)))
            .collect(),
    };

    let response = StatusResponse {
        uptime_seconds: (now - marketplace.started_at())
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0),
        default_profile: marketplace.default_profile().to_string(),
        default_affiliate_code: marketplace.resolver.default_code().to_string(),
        registered_affiliates: marketplace.accounts.len().await,
        profiles,
        errors,
        info,
    };

    (StatusCode::OK, Json(response)).into_response()
}
