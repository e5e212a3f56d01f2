//! HTTP handlers.

mod affiliate;
mod metrics;
mod resellers;
mod status;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, Uri};

pub use affiliate::{generate_handler, landing_handler, resolve_handler, verify_handler};
pub use metrics::metrics_handler;
pub use resellers::{all_resellers_handler, batch_handler, product_resellers_handler};
pub use status::status_handler;

use crate::affiliate::{AffiliateResolver, AttributionRequest, CookieAttributionStore, Resolution};

/// Resolves the affiliate code of a request against its cookies.
///
/// Returns the resolution and the `Set-Cookie` value to send back, if any.
fn resolve_request(
    resolver: &AffiliateResolver,
    uri: &Uri,
    headers: &HeaderMap,
) -> (Resolution, Option<String>) {
    let cookies: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    let cookie_header = (!cookies.is_empty()).then(|| cookies.join("; "));

    let mut store = CookieAttributionStore::from_cookie_header(cookie_header.as_deref());
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let resolution = resolver.resolve(
        &AttributionRequest::from_path_and_query(path_and_query),
        &mut store,
    );
    (resolution, store.set_cookie_header())
}
