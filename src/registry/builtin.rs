//! Built-in reseller pattern table, used when the catalog does not define one.

use super::{PatternKind, ResellerPattern};

fn path(name: &str, domains: &[&str], pattern: &str, verified: bool) -> ResellerPattern {
    ResellerPattern {
        name: name.to_string(),
        domains: domains.iter().map(|d| d.to_string()).collect(),
        pattern: PatternKind::Path {
            pattern: pattern.to_string(),
        },
        verified,
    }
}

fn query(name: &str, domains: &[&str], param: &str, verified: bool) -> ResellerPattern {
    ResellerPattern {
        name: name.to_string(),
        domains: domains.iter().map(|d| d.to_string()).collect(),
        pattern: PatternKind::Query {
            param: param.to_string(),
        },
        verified,
    }
}

/// Resellers whose affiliate link format is known.
pub fn builtin_patterns() -> Vec<ResellerPattern> {
    vec![
        path("RobloxCheatz", &["robloxcheatz.com"], "/affiliate/{code}", true),
        path("Bloxstore", &["bloxstore.gg"], "/r/{code}", true),
        query("Keyempire", &["keyempire.net", "keyempire.shop"], "affiliate", true),
        query("Sellhub", &["sellhub.cx"], "ref", false),
        query("Sellix", &["sellix.io"], "rcid", false),
        query("Sellapp", &["sell.app"], "ref", false),
    ]
}
