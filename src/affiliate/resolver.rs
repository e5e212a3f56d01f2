//! Affiliate code resolution.
//!
//! Precedence, highest first:
//! 1. `affiliate` / `ref` query parameter (persisted)
//! 2. `/affiliate/{code}` path form (persisted, followed by a redirect)
//! 3. the value already persisted in the attribution store
//! 4. the configured default code

use log::debug;
use serde::Serialize;

use crate::affiliate::{AffiliateCode, AttributionStore};
use crate::config::{AFFILIATE_PATH_PREFIX, AFFILIATE_QUERY_PARAMS, AFFILIATE_REDIRECT_TARGET};

/// The parts of an incoming request that can carry an affiliate code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributionRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl AttributionRequest {
    pub fn new(path: impl Into<String>, query: Vec<(String, String)>) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }

    /// Builds a request from a raw path-and-query such as `/shop?ref=abc`.
    pub fn from_path_and_query(path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };
        let query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self::new(path, query)
    }

    fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.as_str())
    }

    /// The `{code}` segment of `/affiliate/{code}`, if the path has that form.
    fn path_code(&self) -> Option<&str> {
        let rest = self.path.strip_prefix(AFFILIATE_PATH_PREFIX)?;
        let segment = rest.strip_suffix('/').unwrap_or(rest);
        if segment.is_empty() || segment.contains('/') {
            None
        } else {
            Some(segment)
        }
    }
}

/// Where a resolved code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
    QueryParameter,
    PathSegment,
    Stored,
    Default,
}

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub code: AffiliateCode,
    pub source: CodeSource,
    /// Page to navigate to after a path-form attribution.
    pub redirect: Option<String>,
}

/// Determines the affiliate code attributed to a request.
#[derive(Debug, Clone)]
pub struct AffiliateResolver {
    default_code: AffiliateCode,
    redirect_target: String,
}

impl AffiliateResolver {
    pub fn new(default_code: AffiliateCode) -> Self {
        Self {
            default_code,
            redirect_target: AFFILIATE_REDIRECT_TARGET.to_string(),
        }
    }

    /// Overrides the page visitors are sent to after `/affiliate/{code}`.
    pub fn with_redirect_target(mut self, target: impl Into<String>) -> Self {
        self.redirect_target = target.into();
        self
    }

    pub fn default_code(&self) -> &AffiliateCode {
        &self.default_code
    }

    /// Resolves the code for `request`, persisting explicit codes into `store`.
    ///
    /// Explicit codes that fail validation are ignored (and never persisted);
    /// resolution continues with the next source.
    pub fn resolve(
        &self,
        request: &AttributionRequest,
        store: &mut dyn AttributionStore,
    ) -> Resolution {
        for param in AFFILIATE_QUERY_PARAMS {
            if let Some(raw) = request.query_value(param) {
                match AffiliateCode::parse(raw) {
                    Ok(code) => {
                        store.set(&code);
                        return Resolution {
                            code,
                            source: CodeSource::QueryParameter,
                            redirect: None,
                        };
                    }
                    Err(e) => debug!("Ignoring {param} query parameter: {e}"),
                }
            }
        }

        if let Some(raw) = request.path_code() {
            match AffiliateCode::parse(raw) {
                Ok(code) => {
                    store.set(&code);
                    return Resolution {
                        code,
                        source: CodeSource::PathSegment,
                        redirect: Some(self.redirect_target.clone()),
                    };
                }
                Err(e) => debug!("Ignoring affiliate path segment: {e}"),
            }
        }

        if let Some(stored) = store.get().filter(|s| !s.is_empty()) {
            return Resolution {
                code: AffiliateCode::trusted(stored),
                source: CodeSource::Stored,
                redirect: None,
            };
        }

        Resolution {
            code: self.default_code.clone(),
            source: CodeSource::Default,
            redirect: None,
        }
    }
}
