//! Reseller data handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::super::types::{with_cookie, ApiError, AppState};
use super::resolve_request;
use crate::aggregator::Aggregator;

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub products: Vec<String>,
}

fn aggregator(state: &AppState, profile: &str) -> Result<Arc<Aggregator>, ApiError> {
    state
        .marketplace
        .aggregator(profile)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("Unknown profile: {profile}")))
}

/// `GET /api/{profile}/resellers/{product}`
pub async fn product_resellers_handler(
    State(state): State<AppState>,
    Path((profile, product)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let aggregator = aggregator(&state, &profile)?;
    let (resolution, set_cookie) = resolve_request(&state.marketplace.resolver, &uri, &headers);

    let resellers = aggregator
        .get_product_resellers(&product, &resolution.code)
        .await;
    Ok(with_cookie(Json(resellers).into_response(), set_cookie))
}

/// `GET /api/{profile}/resellers`
pub async fn all_resellers_handler(
    State(state): State<AppState>,
    Path(profile): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let aggregator = aggregator(&state, &profile)?;
    let (resolution, set_cookie) = resolve_request(&state.marketplace.resolver, &uri, &headers);

    let data = aggregator.get_resellers_data(&resolution.code).await;
    Ok(with_cookie(Json(data).into_response(), set_cookie))
}

/// `POST /api/{profile}/resellers/batch`
pub async fn batch_handler(
    State(state): State<AppState>,
    Path(profile): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let aggregator = aggregator(&state, &profile)?;
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (resolution, set_cookie) = resolve_request(&state.marketplace.resolver, &uri, &headers);

    let batch = aggregator.get_batch(&request.products, &resolution.code).await;
    Ok(with_cookie(Json(batch).into_response(), set_cookie))
}
