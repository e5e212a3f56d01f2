//! Affiliate attribution and account handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_TYPE, REFRESH};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::types::{with_cookie, ApiError, AppState};
use super::resolve_request;
use crate::affiliate::{AffiliateCode, CodeSource};
use crate::config::{AFFILIATE_REDIRECT_DELAY_SECS, AFFILIATE_REDIRECT_TARGET};

#[derive(Serialize)]
pub struct ResolveResponse {
    pub code: AffiliateCode,
    pub source: CodeSource,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub code: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub code: String,
    pub affiliate_url: String,
    pub created_at: DateTime<Utc>,
}

/// `GET /api/affiliate/resolve`
pub async fn resolve_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let (resolution, set_cookie) = resolve_request(&state.marketplace.resolver, &uri, &headers);
    let body = ResolveResponse {
        code: resolution.code,
        source: resolution.source,
    };
    with_cookie(Json(body).into_response(), set_cookie)
}

/// `GET /affiliate/{code}`: stores the code and sends the visitor on after a
/// short delay. Invalid codes are not stored.
pub async fn landing_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let (resolution, set_cookie) = resolve_request(&state.marketplace.resolver, &uri, &headers);
    let target = resolution
        .redirect
        .unwrap_or_else(|| AFFILIATE_REDIRECT_TARGET.to_string());

    let mut response = (StatusCode::OK, landing_page(resolution.code.as_str(), &target)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    if let Ok(refresh) =
        HeaderValue::from_str(&format!("{AFFILIATE_REDIRECT_DELAY_SECS}; url={target}"))
    {
        headers.insert(REFRESH, refresh);
    }
    with_cookie(response, set_cookie)
}

fn landing_page(code: &str, target: &str) -> String {
    let code = escape_html(code);
    let target = escape_html(target);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"{AFFILIATE_REDIRECT_DELAY_SECS}; url={target}\">\n\
         <title>Redirecting</title>\n</head>\n<body>\n\
         <p>Affiliate code <strong>{code}</strong> applied. Redirecting to <a href=\"{target}\">{target}</a>...</p>\n\
         </body>\n</html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// `POST /api/affiliate/generate`
pub async fn generate_handler(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let requested = request
        .code
        .ok_or_else(|| ApiError::bad_request("Missing field: code"))?;

    let generated = state.marketplace.accounts.generate(&requested).await?;
    Ok((StatusCode::CREATED, Json(generated)).into_response())
}

/// `GET /api/affiliate/verify?code=..&password=..`
pub async fn verify_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let (Some(code), Some(password)) = (query.code, query.password) else {
        return Err(ApiError::bad_request("Missing query parameters: code and password"));
    };

    let accounts = &state.marketplace.accounts;
    let record = accounts.verify(&code, &password).await?;
    Ok(Json(VerifyResponse {
        affiliate_url: accounts.affiliate_url(&record.code),
        code: record.code,
        created_at: record.created_at,
    }))
}
