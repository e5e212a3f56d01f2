//! Scrape-and-cache reseller aggregation.
//!
//! One [`Aggregator`] serves one catalog profile. Reads go through a
//! Fresh/Stale check against the in-memory [`AggregateCache`]:
//! - fresh (non-empty and younger than the TTL): stored data is served
//! - stale: every feed is fetched concurrently, the results are normalized
//!   and merged into a new cache, which is persisted and swapped in whole
//!
//! The cache always holds the URLs as the feeds published them; affiliate
//! codes are applied to a copy on every read.

mod cache;
mod feed;
mod normalize;
mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::affiliate::AffiliateCode;
use crate::catalog::{CatalogProfile, FeedSource, PaymentKeyword};
use crate::error_handling::{FeedStats, InfoType};
use crate::registry::PatternRegistry;
use crate::rewrite::rewrite_url;

pub use cache::{load_cache, save_cache, AggregateCache};
pub use feed::{FeedFetcher, FetchedFeed};
pub use normalize::{
    infer_payments, match_known_product, normalize_duration_key, normalize_feed,
    normalize_site_name, reseller_key, NormalizeContext, LIFETIME_KEY,
};
pub use types::{BatchEntry, DurationOffer, ProductResellerEntry, ProductResellers, ResellerMap};

/// Timing and storage settings for an [`Aggregator`].
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub cache_ttl: Duration,
    pub feed_timeout: Duration,
    pub batch_timeout: Duration,
    pub cache_path: PathBuf,
}

/// Reseller aggregator for one catalog profile.
pub struct Aggregator {
    profile: CatalogProfile,
    payment_table: Vec<PaymentKeyword>,
    registry: Arc<PatternRegistry>,
    fetcher: FeedFetcher,
    cache_ttl: Duration,
    cache_path: PathBuf,
    cache: RwLock<Arc<AggregateCache>>,
    refresh_guard: Mutex<()>,
    refreshes: AtomicUsize,
    stats: Arc<FeedStats>,
}

impl Aggregator {
    pub fn new(
        profile: CatalogProfile,
        registry: Arc<PatternRegistry>,
        client: Arc<reqwest::Client>,
        settings: AggregatorSettings,
        stats: Arc<FeedStats>,
    ) -> Self {
        Self {
            payment_table: profile.payment_table(),
            profile,
            registry,
            fetcher: FeedFetcher::new(client, settings.feed_timeout, settings.batch_timeout),
            cache_ttl: settings.cache_ttl,
            cache_path: settings.cache_path,
            cache: RwLock::new(Arc::new(AggregateCache::default())),
            refresh_guard: Mutex::new(()),
            refreshes: AtomicUsize::new(0),
            stats,
        }
    }

    pub fn profile(&self) -> &CatalogProfile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn cache_path(&self) -> &std::path::Path {
        &self.cache_path
    }

    /// Number of refreshes this aggregator has completed.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Loads the persisted cache file into memory.
    ///
    /// A missing file leaves the cache empty; an unreadable or corrupt one is
    /// logged and counted, and the cache stays empty.
    pub async fn load_persisted(&self) {
        match load_cache(&self.cache_path).await {
            Ok(Some(cache)) => {
                info!(
                    "Loaded {} product(s) for profile {} from {}",
                    cache.product_count(),
                    self.profile.name,
                    self.cache_path.display()
                );
                self.store(cache);
            }
            Ok(None) => debug!("No cache file at {}", self.cache_path.display()),
            Err(e) => {
                warn!("Ignoring cache for profile {}: {e}", self.profile.name);
                self.stats.increment_error(e.error_type());
            }
        }
    }

    /// Current in-memory cache, without any freshness check.
    pub fn snapshot(&self) -> Arc<AggregateCache> {
        let guard = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    fn store(&self, cache: AggregateCache) -> Arc<AggregateCache> {
        let cache = Arc::new(cache);
        let mut guard = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&cache);
        cache
    }

    /// Full `product -> reseller key -> entry` map with `code` applied.
    pub async fn get_resellers_data(&self, code: &AffiliateCode) -> ProductResellers {
        let cache = self.ensure_fresh().await;
        cache
            .resellers
            .iter()
            .map(|(product, resellers)| (product.clone(), self.with_code(resellers, code)))
            .collect()
    }

    /// Resellers of one product with `code` applied; empty for unknown products.
    pub async fn get_product_resellers(&self, product: &str, code: &AffiliateCode) -> ResellerMap {
        let cache = self.ensure_fresh().await;
        self.lookup(&cache, product)
            .map(|resellers| self.with_code(resellers, code))
            .unwrap_or_default()
    }

    /// One entry per requested title, with a single freshness check for the batch.
    pub async fn get_batch(
        &self,
        products: &[String],
        code: &AffiliateCode,
    ) -> BTreeMap<String, BatchEntry> {
        let cache = self.ensure_fresh().await;
        products
            .iter()
            .map(|title| {
                let resellers = self
                    .lookup(&cache, title)
                    .map(|resellers| self.with_code(resellers, code))
                    .unwrap_or_default();
                (title.clone(), BatchEntry { resellers })
            })
            .collect()
    }

    fn lookup<'a>(&self, cache: &'a AggregateCache, product: &str) -> Option<&'a ResellerMap> {
        match match_known_product(product, &self.profile.products) {
            Some(name) => cache.resellers.get(name),
            None => cache
                .resellers
                .iter()
                .find(|(name, _)| name.trim().eq_ignore_ascii_case(product.trim()))
                .map(|(_, resellers)| resellers),
        }
    }

    fn with_code(&self, resellers: &ResellerMap, code: &AffiliateCode) -> ResellerMap {
        resellers
            .iter()
            .map(|(key, entry)| {
                let mut entry = entry.clone();
                for offer in entry.durations.values_mut() {
                    offer.url = rewrite_url(&offer.url, code, &self.registry);
                }
                (key.clone(), entry)
            })
            .collect()
    }

    /// Returns a fresh cache, refreshing it first if needed.
    ///
    /// Refreshes are serialized. A caller that waited on the guard reuses the
    /// result of any refresh that completed meanwhile, even an empty one, so
    /// an outage costs one round of feed timeouts rather than one per caller.
    async fn ensure_fresh(&self) -> Arc<AggregateCache> {
        let seen = self.refresh_count();
        let current = self.snapshot();
        if current.is_fresh(Utc::now(), self.cache_ttl) {
            debug!("Cache hit for profile {}", self.profile.name);
            self.stats.increment_info(InfoType::CacheHit);
            return current;
        }
        if self.profile.feeds.is_empty() {
            return current;
        }

        let _guard = self.refresh_guard.lock().await;
        if self.refresh_count() != seen {
            debug!("Profile {} refreshed while waiting", self.profile.name);
            return self.snapshot();
        }
        let current = self.snapshot();
        if current.is_fresh(Utc::now(), self.cache_ttl) {
            self.stats.increment_info(InfoType::CacheHit);
            return current;
        }
        self.refresh().await
    }

    /// Fetches every feed, rebuilds the cache and persists it.
    ///
    /// Persistence failures are logged and counted; the new cache is served
    /// from memory regardless.
    pub async fn refresh(&self) -> Arc<AggregateCache> {
        info!(
            "Refreshing profile {} from {} feed(s)",
            self.profile.name,
            self.profile.feeds.len()
        );
        let fetched = self.fetcher.fetch_all(&self.profile.feeds, &self.stats).await;
        let fetched_count = fetched.len();
        let resellers = self.merge(&self.profile.feeds, fetched);
        let cache = AggregateCache::new(resellers, Utc::now());

        if let Err(e) = save_cache(&self.cache_path, &cache).await {
            warn!("Serving profile {} from memory only: {e}", self.profile.name);
            self.stats.increment_error(e.error_type());
        }

        info!(
            "Refreshed profile {}: {} product(s) from {}/{} feed(s)",
            self.profile.name,
            cache.product_count(),
            fetched_count,
            self.profile.feeds.len()
        );
        let cache = self.store(cache);
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.stats.increment_info(InfoType::CacheRefresh);
        cache
    }

    /// Normalizes fetched documents and merges them in feed order, so a later
    /// feed's entry replaces an earlier one with the same reseller key.
    fn merge(&self, feeds: &[FeedSource], fetched: Vec<FetchedFeed>) -> ProductResellers {
        let ctx = NormalizeContext {
            known_products: &self.profile.products,
            payment_table: &self.payment_table,
            registry: &self.registry,
        };

        let mut merged = ProductResellers::new();
        for FetchedFeed { index, document } in fetched {
            let site = feeds.get(index).map(|f| f.site.as_str()).unwrap_or_default();
            for (product, resellers) in normalize_feed(&document, site, &ctx, &self.stats) {
                merged.entry(product).or_default().extend(resellers);
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn profile() -> CatalogProfile {
        CatalogProfile {
            name: "roblox".to_string(),
            feeds: vec![
                FeedSource {
                    site: "First".to_string(),
                    url: "http://127.0.0.1:9/first.json".to_string(),
                },
                FeedSource {
                    site: "Second".to_string(),
                    url: "http://127.0.0.1:9/second.json".to_string(),
                },
            ],
            products: vec!["Wave".to_string(), "Synapse Z".to_string()],
            payment_keywords: Vec::new(),
            cache_file: None,
        }
    }

    fn aggregator(dir: &TempDir) -> Aggregator {
        Aggregator::new(
            profile(),
            Arc::new(PatternRegistry::builtin()),
            Arc::new(reqwest::Client::new()),
            AggregatorSettings {
                cache_ttl: Duration::from_secs(300),
                feed_timeout: Duration::from_millis(200),
                batch_timeout: Duration::from_millis(500),
                cache_path: dir.path().join("roblox_resellers.json"),
            },
            Arc::new(FeedStats::new()),
        )
    }

    fn document(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_later_feed_wins_per_key() {
        let dir = TempDir::new().unwrap();
        let agg = aggregator(&dir);
        let feeds = agg.profile().feeds.clone();

        let fetched = vec![
            FetchedFeed {
                index: 0,
                document: document(json!({
                    "Shop": {"wave": {"7": {"price": "1", "url": "https://a.example/1"}}}
                })),
            },
            FetchedFeed {
                index: 1,
                document: document(json!({
                    "Shop": {"wave": {"7": {"price": "2", "url": "https://b.example/2"}}},
                    "Other": {"synapse z": {"30": {"price": "3", "url": "https://c.example/3"}}}
                })),
            },
        ];
        let merged = agg.merge(&feeds, fetched);

        // different sites give different reseller keys, so both entries survive
        assert_eq!(merged["Wave"].len(), 2);
        assert_eq!(merged["Wave"]["Shopfirst"].durations["7"].price, "1");
        assert_eq!(merged["Wave"]["Shopsecond"].durations["7"].price, "2");
        assert!(merged["Synapse Z"].contains_key("Othersecond"));
    }

    #[test]
    fn test_merge_same_site_overwrites() {
        let dir = TempDir::new().unwrap();
        let agg = aggregator(&dir);
        let feeds = vec![
            FeedSource {
                site: "Voxlis".to_string(),
                url: "u1".to_string(),
            },
            FeedSource {
                site: "voxlis".to_string(),
                url: "u2".to_string(),
            },
        ];
        let fetched = vec![
            FetchedFeed {
                index: 0,
                document: document(json!({"Shop": {"wave": {"7": {"price": "1", "url": "https://a.example"}}}})),
            },
            FetchedFeed {
                index: 1,
                document: document(json!({"Shop": {"wave": {"30": {"price": "9", "url": "https://a.example"}}}})),
            },
        ];
        let merged = agg.merge(&feeds, fetched);
        let entry = &merged["Wave"]["Shopvoxlis"];
        assert!(!entry.durations.contains_key("7"));
        assert_eq!(entry.durations["30"].price, "9");
    }

    #[tokio::test]
    async fn test_fresh_cache_served_with_code_applied() {
        let dir = TempDir::new().unwrap();
        let agg = aggregator(&dir);
        let fetched = vec![FetchedFeed {
            index: 0,
            document: document(json!({
                "Shop": {"wave": {"7": {"price": "1", "url": "https://unknownshop.example/item"}}}
            })),
        }];
        let merged = agg.merge(&agg.profile().feeds.clone(), fetched);
        agg.store(AggregateCache::new(merged, Utc::now()));

        let code = AffiliateCode::parse("abc123").unwrap();
        let resellers = agg.get_product_resellers(" WAVE ", &code).await;
        assert_eq!(
            resellers["Shopfirst"].durations["7"].url,
            "https://unknownshop.example/item?ref=abc123"
        );

        // the cache keeps the raw URL
        assert_eq!(
            agg.snapshot().resellers["Wave"]["Shopfirst"].durations["7"].url,
            "https://unknownshop.example/item"
        );
        assert_eq!(agg.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_returns_every_requested_title() {
        let dir = TempDir::new().unwrap();
        let agg = aggregator(&dir);
        let fetched = vec![FetchedFeed {
            index: 0,
            document: document(json!({
                "Shop": {"wave": {"7": {"price": "1", "url": "https://unknownshop.example/item"}}}
            })),
        }];
        let merged = agg.merge(&agg.profile().feeds.clone(), fetched);
        agg.store(AggregateCache::new(merged, Utc::now()));

        let code = AffiliateCode::parse("abc123").unwrap();
        let batch = agg
            .get_batch(&["Wave".to_string(), "Missing".to_string()], &code)
            .await;

        assert_eq!(batch.len(), 2);
        assert_eq!(batch["Wave"].resellers.len(), 1);
        assert!(batch["Missing"].resellers.is_empty());
    }

    #[tokio::test]
    async fn test_profile_without_feeds_never_fetches() {
        let dir = TempDir::new().unwrap();
        let mut profile = profile();
        profile.feeds.clear();
        let agg = Aggregator::new(
            profile,
            Arc::new(PatternRegistry::builtin()),
            Arc::new(reqwest::Client::new()),
            AggregatorSettings {
                cache_ttl: Duration::from_secs(300),
                feed_timeout: Duration::from_secs(1),
                batch_timeout: Duration::from_secs(1),
                cache_path: dir.path().join("empty.json"),
            },
            Arc::new(FeedStats::new()),
        );

        let code = AffiliateCode::parse("abc123").unwrap();
        assert!(agg.get_resellers_data(&code).await.is_empty());
        assert_eq!(agg.refresh_count(), 0);
    }
}
