//! Normalization of raw feed documents.
//!
//! A feed document maps reseller names to objects whose keys are product
//! names (plus the reserved `pfp`, `premium`, `payments` and `verified`
//! keys) and whose values map duration strings to `{price, url}`.

use std::collections::BTreeMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::types::{DurationOffer, ProductResellerEntry, ProductResellers};
use crate::catalog::PaymentKeyword;
use crate::config::DEFAULT_PAYMENTS;
use crate::error_handling::{FeedStats, InfoType};
use crate::registry::PatternRegistry;

/// Normalized key for lifetime offers.
pub const LIFETIME_KEY: &str = "lifetime";

const LIFETIME_ALIASES: &[&str] = &["lifetime", "permanent", "forever", "life", "lifetime access"];

/// Keys of a reseller object that describe the reseller, not a product.
const RESERVED_KEYS: &[&str] = &["pfp", "premium", "payments", "verified"];

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)[\s-]*([a-z]*)$").expect("duration pattern is a valid regex")
});

/// Normalizes a duration string to `"lifetime"` or a number of days.
///
/// Weeks, months and years count as 7, 30 and 365 days. Strings that are
/// neither are returned trimmed and lower-cased.
pub fn normalize_duration_key(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    if LIFETIME_ALIASES.contains(&key.as_str()) {
        return LIFETIME_KEY.to_string();
    }

    let days = DURATION_PATTERN.captures(&key).and_then(|caps| {
        let count: u64 = caps[1].parse().ok()?;
        let per_unit = match &caps[2] {
            "" | "d" | "day" | "days" => 1,
            "w" | "wk" | "wks" | "week" | "weeks" => 7,
            "m" | "mo" | "mos" | "month" | "months" => 30,
            "y" | "yr" | "yrs" | "year" | "years" => 365,
            _ => return None,
        };
        count.checked_mul(per_unit)
    });

    match days {
        Some(days) => days.to_string(),
        None => key,
    }
}

/// Normalizes a feed's site name for use in reseller keys.
pub fn normalize_site_name(site: &str) -> String {
    site.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Key identifying a reseller across feeds.
pub fn reseller_key(raw_name: &str, site: &str) -> String {
    format!("{}{}", raw_name, normalize_site_name(site))
}

/// Allow-list spelling of `name`, matched case-insensitively.
pub fn match_known_product<'a>(name: &str, known: &'a [String]) -> Option<&'a str> {
    let name = name.trim();
    known
        .iter()
        .find(|candidate| candidate.trim().to_lowercase() == name.to_lowercase())
        .map(|candidate| candidate.as_str())
}

/// Infers payment methods from the serialized reseller object.
///
/// Methods are reported once each, in keyword-table order; `["crypto", "paypal"]`
/// when no keyword matches.
pub fn infer_payments(raw: &Value, table: &[PaymentKeyword]) -> Vec<String> {
    let haystack = raw.to_string().to_lowercase();
    let mut methods: Vec<String> = Vec::new();
    for entry in table {
        let keyword = entry.keyword.to_lowercase();
        if !keyword.is_empty() && haystack.contains(&keyword) && !methods.contains(&entry.method)
        {
            methods.push(entry.method.clone());
        }
    }

    if methods.is_empty() {
        DEFAULT_PAYMENTS.iter().map(|m| m.to_string()).collect()
    } else {
        methods
    }
}

/// Everything needed to normalize documents for one profile.
pub struct NormalizeContext<'a> {
    pub known_products: &'a [String],
    pub payment_table: &'a [PaymentKeyword],
    pub registry: &'a PatternRegistry,
}

/// Converts one feed document into per-product reseller maps.
///
/// Unknown products, non-object entries and durations without both a price
/// and a URL are dropped; products left without durations are dropped too.
pub fn normalize_feed(
    document: &Map<String, Value>,
    site: &str,
    ctx: &NormalizeContext<'_>,
    stats: &FeedStats,
) -> ProductResellers {
    let mut products = ProductResellers::new();

    for (reseller_name, reseller) in document {
        let Some(fields) = reseller.as_object() else {
            debug!("Skipping reseller {reseller_name:?} from {site}: not an object");
            stats.increment_info(InfoType::EntrySkipped);
            continue;
        };

        let payments = explicit_payments(fields)
            .unwrap_or_else(|| infer_payments(reseller, ctx.payment_table));
        let pfp = fields
            .get("pfp")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let premium = fields.get("premium").is_some_and(is_truthy);
        let explicit_verified = fields.get("verified").map(is_truthy);

        for (product_name, offers) in fields {
            if RESERVED_KEYS.contains(&product_name.as_str()) {
                continue;
            }
            let Some(product) = match_known_product(product_name, ctx.known_products) else {
                stats.increment_info(InfoType::UnknownProductDropped);
                continue;
            };
            let Some(offers) = offers.as_object() else {
                debug!("Skipping {reseller_name:?}/{product_name:?} from {site}: offers are not an object");
                stats.increment_info(InfoType::EntrySkipped);
                continue;
            };

            let durations = normalize_durations(offers, stats);
            if durations.is_empty() {
                continue;
            }

            let verified = explicit_verified.unwrap_or_else(|| {
                durations
                    .values()
                    .any(|offer| ctx.registry.is_verified_url(&offer.url))
            });

            products.entry(product.to_string()).or_default().insert(
                reseller_key(reseller_name, site),
                ProductResellerEntry {
                    name: reseller_name.clone(),
                    pfp: pfp.clone(),
                    payments: payments.clone(),
                    durations,
                    verified,
                    premium,
                },
            );
        }
    }

    products
}

fn normalize_durations(offers: &Map<String, Value>, stats: &FeedStats) -> BTreeMap<String, DurationOffer> {
    let mut durations = BTreeMap::new();
    for (raw_key, offer) in offers {
        let price = offer.get("price").and_then(price_string);
        let url = offer
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (price, url) {
            (Some(price), Some(url)) => {
                durations
                    .entry(normalize_duration_key(raw_key))
                    .or_insert_with(|| DurationOffer {
                        price,
                        url: url.to_string(),
                    });
            }
            _ => stats.increment_info(InfoType::DurationDropped),
        }
    }
    durations
}

fn explicit_payments(fields: &Map<String, Value>) -> Option<Vec<String>> {
    let methods: Vec<String> = fields
        .get("payments")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect();
    (!methods.is_empty()).then_some(methods)
}

fn price_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}
