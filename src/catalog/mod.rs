//! Catalog: which feeds to aggregate, which products to keep, and how
//! reseller links are rewritten.
//!
//! A catalog holds one [`CatalogProfile`] per storefront (e.g. one per game);
//! each profile drives its own aggregator. Profiles share the reseller pattern
//! table.

mod defaults;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error_handling::CatalogError;
use crate::registry::{builtin_patterns, PatternRegistry, ResellerPattern};

pub use defaults::{builtin_catalog, default_payment_keywords};

/// One upstream JSON feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Human-readable site name; its normalized form disambiguates reseller keys.
    pub site: String,
    pub url: String,
}

/// Substring that, when found in a reseller entry, implies a payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentKeyword {
    pub keyword: String,
    pub method: String,
}

/// Aggregation settings for one storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProfile {
    pub name: String,
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
    /// Allow-list of product identifiers, in display spelling.
    pub products: Vec<String>,
    /// Keyword table for payment inference; built-in table when empty.
    #[serde(default)]
    pub payment_keywords: Vec<PaymentKeyword>,
    /// Cache file name, relative to the data directory.
    #[serde(default)]
    pub cache_file: Option<String>,
}

impl CatalogProfile {
    /// Cache file name, defaulting to `<name>_resellers.json`.
    pub fn cache_file_name(&self) -> String {
        self.cache_file
            .clone()
            .unwrap_or_else(|| format!("{}_resellers.json", self.name))
    }

    /// The configured keyword table, or the built-in one when none is set.
    pub fn payment_table(&self) -> Vec<PaymentKeyword> {
        if self.payment_keywords.is_empty() {
            default_payment_keywords()
        } else {
            self.payment_keywords.clone()
        }
    }
}

/// A full catalog as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub default_profile: Option<String>,
    pub profiles: Vec<CatalogProfile>,
    /// Reseller pattern table; built-in table when absent.
    #[serde(default)]
    pub resellers: Option<Vec<ResellerPattern>>,
}

impl Catalog {
    /// Loads and validates a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Catalog =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads `path` when given, otherwise returns the built-in catalog.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(builtin_catalog()),
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.profiles.is_empty() {
            return Err(CatalogError::NoProfiles);
        }
        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if !seen.insert(profile.name.as_str()) {
                return Err(CatalogError::DuplicateProfile(profile.name.clone()));
            }
        }
        if let Some(default) = &self.default_profile {
            if !seen.contains(default.as_str()) {
                return Err(CatalogError::UnknownDefaultProfile(default.clone()));
            }
        }
        self.registry().map(|_| ())
    }

    /// Name of the profile used when a request does not pick one.
    pub fn default_profile_name(&self) -> Option<&str> {
        self.default_profile
            .as_deref()
            .or_else(|| self.profiles.first().map(|p| p.name.as_str()))
    }

    /// Total number of feeds across every profile.
    pub fn feed_count(&self) -> usize {
        self.profiles.iter().map(|p| p.feeds.len()).sum()
    }

    pub fn profile(&self, name: &str) -> Option<&CatalogProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Pattern registry for this catalog.
    pub fn registry(&self) -> Result<PatternRegistry, CatalogError> {
        PatternRegistry::new(self.resellers.clone().unwrap_or_else(builtin_patterns))
    }
}
