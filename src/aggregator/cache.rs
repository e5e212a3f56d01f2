//! Aggregate cache and its flat JSON file.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::types::ProductResellers;
use crate::error_handling::CacheError;

/// Merged reseller data for one profile, as fetched (URLs are not rewritten).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCache {
    pub resellers: ProductResellers,
    /// When the last refresh completed; `None` if never refreshed.
    pub last_updated: Option<DateTime<Utc>>,
}

impl AggregateCache {
    pub fn new(resellers: ProductResellers, last_updated: DateTime<Utc>) -> Self {
        Self {
            resellers,
            last_updated: Some(last_updated),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resellers.is_empty()
    }

    /// Time since the last refresh; `None` if never refreshed.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_updated
            .map(|updated| (now - updated).to_std().unwrap_or(Duration::ZERO))
    }

    /// Whether the cache can be served without refetching.
    ///
    /// An empty cache is never fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.is_empty() && self.age(now).is_some_and(|age| age <= ttl)
    }

    /// Number of products with at least one reseller.
    pub fn product_count(&self) -> usize {
        self.resellers.values().filter(|r| !r.is_empty()).count()
    }
}

/// Loads a cache file; a missing file is `Ok(None)`.
pub async fn load_cache(path: &Path) -> Result<Option<AggregateCache>, CacheError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::PersistenceFailure {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes the cache file, replacing any previous one in a single rename.
pub async fn save_cache(path: &Path, cache: &AggregateCache) -> Result<(), CacheError> {
    let content = serde_json::to_string_pretty(cache)?;
    let persistence = |source: std::io::Error| CacheError::PersistenceFailure {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(persistence)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).await.map_err(persistence)?;
    fs::rename(&tmp, path).await.map_err(persistence)
}
