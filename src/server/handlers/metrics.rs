//! Prometheus metrics handler.

use std::fmt::Write;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use strum::IntoEnumIterator;

use super::super::types::AppState;
use crate::error_handling::{ErrorType, InfoType};

/// Prometheus-compatible metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    let marketplace = &state.marketplace;
    let stats = &marketplace.stats;
    let now = Utc::now();
    let mut metrics = String::new();

    // write! into a String cannot fail
    let _ = writeln!(
        metrics,
        "# HELP affiliate_hub_refreshes_total Completed cache refreshes per profile\n\
         # TYPE affiliate_hub_refreshes_total counter"
    );
    for aggregator in marketplace.aggregators() {
        let _ = writeln!(
            metrics,
            "affiliate_hub_refreshes_total{{profile=\"{}\"}} {}",
            aggregator.name(),
            aggregator.refresh_count()
        );
    }

    let _ = writeln!(
        metrics,
        "\n# HELP affiliate_hub_cached_products Products with at least one reseller in the cache\n\
         # TYPE affiliate_hub_cached_products gauge"
    );
    for aggregator in marketplace.aggregators() {
        let _ = writeln!(
            metrics,
            "affiliate_hub_cached_products{{profile=\"{}\"}} {}",
            aggregator.name(),
            aggregator.snapshot().product_count()
        );
    }

    let _ = writeln!(
        metrics,
        "\n# HELP affiliate_hub_cache_age_seconds Seconds since the last refresh (-1 if never)\n\
         # TYPE affiliate_hub_cache_age_seconds gauge"
    );
    for aggregator in marketplace.aggregators() {
        let age = aggregator
            .snapshot()
            .age(now)
            .map(|age| age.as_secs_f64())
            .unwrap_or(-1.0);
        let _ = writeln!(
            metrics,
            "affiliate_hub_cache_age_seconds{{profile=\"{}\"}} {}",
            aggregator.name(),
            age
        );
    }

    let _ = writeln!(
        metrics,
        "\n# HELP affiliate_hub_errors_total Feed and cache failures by type\n\
         # TYPE affiliate_hub_errors_total counter"
    );
    for error_type in ErrorType::iter() {
        let _ = writeln!(
            metrics,
            "affiliate_hub_errors_total{{type=\"{}\"}} {}",
            error_type.label(),
            stats.get_error_count(error_type)
        );
    }

    let _ = writeln!(
        metrics,
        "\n# HELP affiliate_hub_events_total Informational aggregation events by type\n\
         # TYPE affiliate_hub_events_total counter"
    );
    for info_type in InfoType::iter() {
        let _ = writeln!(
            metrics,
            "affiliate_hub_events_total{{type=\"{}\"}} {}",
            info_type.label(),
            stats.get_info_count(info_type)
        );
    }

    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics,
    )
        .into_response()
}
