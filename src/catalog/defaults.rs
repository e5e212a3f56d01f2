//! Built-in catalog used when no catalog file is configured.
//!
//! Built-in profiles carry no feeds: feed URLs are deployment specific and
//! must come from a catalog file.

use super::{Catalog, CatalogProfile, PaymentKeyword};

/// Keyword table used by profiles that do not configure their own.
///
/// Order matters: inferred methods are reported in table order.
pub fn default_payment_keywords() -> Vec<PaymentKeyword> {
    [
        ("crypto", "crypto"),
        ("bitcoin", "crypto"),
        ("btc", "crypto"),
        ("ethereum", "crypto"),
        ("litecoin", "crypto"),
        ("ltc", "crypto"),
        ("usdt", "crypto"),
        ("monero", "crypto"),
        ("xmr", "crypto"),
        ("paypal", "paypal"),
        ("stripe", "stripe"),
        ("credit card", "card"),
        ("debit card", "card"),
        ("visa", "card"),
        ("mastercard", "card"),
        ("cashapp", "cashapp"),
        ("cash app", "cashapp"),
        ("venmo", "venmo"),
        ("robux", "robux"),
    ]
    .into_iter()
    .map(|(keyword, method)| PaymentKeyword {
        keyword: keyword.to_string(),
        method: method.to_string(),
    })
    .collect()
}

fn profile(name: &str, products: &[&str]) -> CatalogProfile {
    CatalogProfile {
        name: name.to_string(),
        feeds: Vec::new(),
        products: products.iter().map(|p| p.to_string()).collect(),
        payment_keywords: Vec::new(),
        cache_file: None,
    }
}

/// Catalog with one profile per storefront and the built-in reseller table.
pub fn builtin_catalog() -> Catalog {
    Catalog {
        default_profile: Some("roblox".to_string()),
        profiles: vec![
            profile(
                "roblox",
                &[
                    "Wave",
                    "Synapse Z",
                    "Seliware",
                    "AWP",
                    "MacSploit",
                    "Zenith",
                    "Solara",
                    "Swift",
                    "Volcano",
                    "Velocity",
                    "Cryptic",
                    "Delta",
                    "Codex",
                    "Potassium",
                ],
            ),
            profile(
                "cs2",
                &[
                    "Neverlose",
                    "Gamesense",
                    "Aimware",
                    "Fatality",
                    "Memesense",
                    "Nixware",
                    "Midnight",
                    "Predator",
                ],
            ),
            profile(
                "rust",
                &["Disconnect", "Serotonin", "Quantum", "Fecurity", "Monolith"],
            ),
        ],
        resellers: None,
    }
}
