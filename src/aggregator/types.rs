//! Aggregated reseller data structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Price and purchase link for one subscription length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationOffer {
    pub price: String,
    pub url: String,
}

/// One reseller's offer for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResellerEntry {
    pub name: String,
    /// Profile picture URL
    #[serde(default)]
    pub pfp: Option<String>,
    pub payments: Vec<String>,
    /// Offers keyed by normalized duration key
    pub durations: BTreeMap<String, DurationOffer>,
    pub verified: bool,
    pub premium: bool,
}

/// Offers for one product, keyed by reseller key (`name + site`).
pub type ResellerMap = BTreeMap<String, ProductResellerEntry>;

/// Offers for every known product, keyed by product name.
pub type ProductResellers = BTreeMap<String, ResellerMap>;

/// One product's slot in a batch response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub resellers: ResellerMap,
}
