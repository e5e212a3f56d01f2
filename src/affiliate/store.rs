//! Persisted attribution.
//!
//! The attributed code lives client-side (a cookie in the HTTP service). The
//! resolver only sees it through the [`AttributionStore`] trait so it can be
//! driven by a cookie jar, an in-memory value in tests, or anything else.

use crate::affiliate::AffiliateCode;
use crate::config::{AFFILIATE_COOKIE_MAX_AGE_SECS, AFFILIATE_COOKIE_NAME};

/// Storage for the attributed affiliate code of one visitor.
pub trait AttributionStore {
    /// The persisted value, if any. Returned verbatim.
    fn get(&self) -> Option<String>;

    /// Overwrites the persisted value.
    fn set(&mut self, code: &AffiliateCode);

    /// Removes the persisted value.
    fn clear(&mut self);
}

/// Attribution held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAttributionStore {
    value: Option<String>,
}

impl MemoryAttributionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }
}

impl AttributionStore for MemoryAttributionStore {
    fn get(&self) -> Option<String> {
        self.value.clone()
    }

    fn set(&mut self, code: &AffiliateCode) {
        self.value = Some(code.as_str().to_string());
    }

    fn clear(&mut self) {
        self.value = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CookieWrite {
    Set(String),
    Clear,
}

/// Attribution carried by the `affiliate_code` cookie of an HTTP request.
///
/// Reads come from the request's `Cookie` header; writes are recorded and
/// turned into a `Set-Cookie` header value for the response.
#[derive(Debug, Clone, Default)]
pub struct CookieAttributionStore {
    current: Option<String>,
    pending: Option<CookieWrite>,
}

impl CookieAttributionStore {
    /// Builds the store from the raw `Cookie` request header.
    pub fn from_cookie_header(header: Option<&str>) -> Self {
        Self {
            current: header.and_then(|h| find_cookie(h, AFFILIATE_COOKIE_NAME)),
            pending: None,
        }
    }

    /// `Set-Cookie` value for the response, if the store was written to.
    pub fn set_cookie_header(&self) -> Option<String> {
        match self.pending.as_ref()? {
            CookieWrite::Set(value) => Some(format!(
                "{}={}; Max-Age={}; Path=/; SameSite=Lax",
                AFFILIATE_COOKIE_NAME, value, AFFILIATE_COOKIE_MAX_AGE_SECS
            )),
            CookieWrite::Clear => Some(format!(
                "{}=; Max-Age=0; Path=/; SameSite=Lax",
                AFFILIATE_COOKIE_NAME
            )),
        }
    }
}

impl AttributionStore for CookieAttributionStore {
    fn get(&self) -> Option<String> {
        self.current.clone()
    }

    fn set(&mut self, code: &AffiliateCode) {
        self.current = Some(code.as_str().to_string());
        self.pending = Some(CookieWrite::Set(code.as_str().to_string()));
    }

    fn clear(&mut self) {
        self.current = None;
        self.pending = Some(CookieWrite::Clear);
    }
}

/// Finds a non-empty cookie value by name in a `Cookie` header.
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
