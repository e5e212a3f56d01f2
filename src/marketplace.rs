//! Explicitly constructed service graph shared by every request.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info, warn};

use crate::affiliate::{AffiliateAccounts, AffiliateCode, AffiliateResolver};
use crate::aggregator::{Aggregator, AggregatorSettings};
use crate::catalog::Catalog;
use crate::config::{Config, ACCOUNTS_FILE};
use crate::error_handling::{FeedStats, InitializationError};
use crate::initialization::init_client;
use crate::registry::PatternRegistry;

/// Resolver, pattern registry, one aggregator per catalog profile, and the
/// affiliate account store.
pub struct Marketplace {
    pub resolver: AffiliateResolver,
    pub registry: Arc<PatternRegistry>,
    pub accounts: AffiliateAccounts,
    pub stats: Arc<FeedStats>,
    aggregators: BTreeMap<String, Arc<Aggregator>>,
    default_profile: String,
    started_at: DateTime<Utc>,
}

impl Marketplace {
    /// Builds every service from `config`, loading the catalog, the cache
    /// files and the affiliate records.
    pub async fn init(config: &Config) -> Result<Self, InitializationError> {
        let catalog = Catalog::load_or_builtin(config.catalog.as_deref())?;
        let client = init_client(config)?;
        Self::from_catalog(config, catalog, client).await
    }

    /// Builds every service from an already loaded catalog.
    pub async fn from_catalog(
        config: &Config,
        catalog: Catalog,
        client: Arc<reqwest::Client>,
    ) -> Result<Self, InitializationError> {
        catalog.validate()?;
        let default_code = AffiliateCode::parse(&config.default_affiliate_code)?;
        let registry = Arc::new(catalog.registry()?);
        let stats = Arc::new(FeedStats::new());
        let default_profile = catalog
            .default_profile_name()
            .unwrap_or_default()
            .to_string();

        if catalog.feed_count() == 0 {
            error!(
                "No feeds configured in any profile; every reseller map will be empty. \
                 Pass --catalog <path> with feed URLs to serve live data"
            );
        }

        let mut aggregators = BTreeMap::new();
        for profile in catalog.profiles {
            if profile.feeds.is_empty() {
                warn!(
                    "Profile {} has no feeds; it serves only its cache file",
                    profile.name
                );
            }
            let settings = AggregatorSettings {
                cache_ttl: config.cache_ttl(),
                feed_timeout: config.feed_timeout(),
                batch_timeout: config.batch_timeout(),
                cache_path: config.data_dir.join(profile.cache_file_name()),
            };
            let aggregator = Aggregator::new(
                profile,
                Arc::clone(&registry),
                Arc::clone(&client),
                settings,
                Arc::clone(&stats),
            );
            aggregator.load_persisted().await;
            aggregators.insert(aggregator.name().to_string(), Arc::new(aggregator));
        }

        let accounts = AffiliateAccounts::open(
            config.data_dir.join(ACCOUNTS_FILE),
            config.public_base_url.clone(),
            vec![default_code.as_str().to_string()],
        )
        .await?;

        info!(
            "Marketplace ready: {} profile(s), default profile {}, default code {}",
            aggregators.len(),
            default_profile,
            default_code
        );

        Ok(Self {
            resolver: AffiliateResolver::new(default_code),
            registry,
            accounts,
            stats,
            aggregators,
            default_profile,
            started_at: Utc::now(),
        })
    }

    pub fn aggregator(&self, profile: &str) -> Option<&Arc<Aggregator>> {
        self.aggregators.get(profile)
    }

    /// Aggregators in profile-name order.
    pub fn aggregators(&self) -> impl Iterator<Item = &Arc<Aggregator>> {
        self.aggregators.values()
    }

    pub fn default_profile(&self) -> &str {
        &self.default_profile
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
