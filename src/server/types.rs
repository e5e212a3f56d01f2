//! Server state and response types.

use std::sync::Arc;

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error_handling::AffiliateError;
use crate::marketplace::Marketplace;

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub marketplace: Arc<Marketplace>,
}

impl AppState {
    pub fn new(marketplace: Arc<Marketplace>) -> Self {
        Self { marketplace }
    }
}

/// Error returned to API clients as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<AffiliateError> for ApiError {
    fn from(error: AffiliateError) -> Self {
        let status = match error {
            AffiliateError::InvalidCodeFormat(_) => StatusCode::BAD_REQUEST,
            AffiliateError::CodeAlreadyExists(_) => StatusCode::CONFLICT,
            AffiliateError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AffiliateError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Adds a `Set-Cookie` header when the attribution store was written to.
pub fn with_cookie(mut response: Response, set_cookie: Option<String>) -> Response {
    if let Some(value) = set_cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

/// JSON response for `/status`
#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_seconds: f64,
    pub default_profile: String,
    pub default_affiliate_code: String,
    pub registered_affiliates: usize,
    pub profiles: Vec<ProfileStatus>,
    pub errors: CounterGroup,
    pub info: CounterGroup,
}

#[derive(Serialize)]
pub struct ProfileStatus {
    pub name: String,
    pub feeds: usize,
    pub products: usize,
    pub cache_age_seconds: Option<f64>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub refreshes: usize,
}

#[derive(Serialize)]
pub struct CounterGroup {
    pub total: usize,
    pub by_type: std::collections::BTreeMap<&'static str, usize>,
}
