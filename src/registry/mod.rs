//! Reseller pattern registry.
//!
//! Maps reseller domains to the way their purchase links carry an affiliate
//! code. Lookups match the URL's host against each reseller's domains by
//! substring, in registration order; the first match wins.

mod builtin;

use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::CODE_PLACEHOLDER;
use crate::error_handling::CatalogError;

pub use builtin::builtin_patterns;

/// How a reseller's links embed the affiliate code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PatternKind {
    /// Replace the whole URL path with `pattern`, substituting `{code}`.
    Path { pattern: String },
    /// Set query parameter `param` to the code.
    Query { param: String },
}

/// Static rewrite configuration for one reseller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResellerPattern {
    pub name: String,
    pub domains: Vec<String>,
    pub pattern: PatternKind,
    #[serde(default)]
    pub verified: bool,
}

impl ResellerPattern {
    fn matches_host(&self, host: &str) -> bool {
        self.domains
            .iter()
            .any(|domain| !domain.is_empty() && host.contains(&domain.to_ascii_lowercase()))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidPattern {
            reseller: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.domains.iter().all(|d| d.trim().is_empty()) {
            return Err(invalid("no domains configured"));
        }
        match &self.pattern {
            PatternKind::Path { pattern } => {
                if !pattern.starts_with('/') {
                    return Err(invalid("path pattern must start with '/'"));
                }
                if !pattern.contains(CODE_PLACEHOLDER) {
                    return Err(invalid("path pattern must contain {code}"));
                }
            }
            PatternKind::Query { param } => {
                if param.trim().is_empty() {
                    return Err(invalid("query pattern needs a param"));
                }
            }
        }
        Ok(())
    }
}

/// Ordered, immutable collection of reseller patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    entries: Vec<ResellerPattern>,
}

impl PatternRegistry {
    /// Builds a registry, rejecting patterns that cannot be applied.
    pub fn new(entries: Vec<ResellerPattern>) -> Result<Self, CatalogError> {
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self { entries })
    }

    /// Registry with the built-in reseller table.
    pub fn builtin() -> Self {
        Self {
            entries: builtin_patterns(),
        }
    }

    pub fn entries(&self) -> &[ResellerPattern] {
        &self.entries
    }

    /// Pattern for the reseller hosting `url`, or `None` for unknown or unparseable URLs.
    pub fn lookup(&self, url: &str) -> Option<&ResellerPattern> {
        match Url::parse(url.trim()) {
            Ok(parsed) => parsed.host_str().and_then(|host| self.lookup_host(host)),
            Err(e) => {
                debug!("Pattern lookup on unparseable URL {url:?}: {e}");
                None
            }
        }
    }

    /// Pattern whose domains occur in `host`.
    pub fn lookup_host(&self, host: &str) -> Option<&ResellerPattern> {
        let host = host.to_ascii_lowercase();
        self.entries.iter().find(|entry| entry.matches_host(&host))
    }

    /// Whether `url` belongs to a reseller marked as verified.
    pub fn is_verified_url(&self, url: &str) -> bool {
        self.lookup(url).is_some_and(|entry| entry.verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_pattern(name: &str, domain: &str) -> ResellerPattern {
        ResellerPattern {
            name: name.to_string(),
            domains: vec![domain.to_string()],
            pattern: PatternKind::Path {
                pattern: "/affiliate/{code}".to_string(),
            },
            verified: true,
        }
    }

    #[test]
    fn test_lookup_matches_host_substring() {
        let registry = PatternRegistry::new(vec![path_pattern("Cheatz", "robloxcheatz.com")]).unwrap();
        assert_eq!(
            registry
                .lookup("https://www.robloxcheatz.com/group/wave")
                .map(|p| p.name.as_str()),
            Some("Cheatz")
        );
        assert_eq!(
            registry
                .lookup("https://ROBLOXCHEATZ.COM/")
                .map(|p| p.name.as_str()),
            Some("Cheatz")
        );
    }

    #[test]
    fn test_lookup_first_registered_match_wins() {
        let registry = PatternRegistry::new(vec![
            path_pattern("First", "shop.com"),
            path_pattern("Second", "myshop.com"),
        ])
        .unwrap();
        assert_eq!(
            registry.lookup("https://myshop.com/x").map(|p| p.name.as_str()),
            Some("First")
        );
    }

    #[test]
    fn test_lookup_unknown_or_invalid_returns_none() {
        let registry = PatternRegistry::builtin();
        assert!(registry.lookup("https://unknownshop.example/item/5").is_none());
        assert!(registry.lookup("not a url").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_pattern_kind_wire_format() {
        let json = r#"{"name":"Q","domains":["q.example"],"pattern":{"type":"query","param":"aff"}}"#;
        let parsed: ResellerPattern = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.pattern,
            PatternKind::Query {
                param: "aff".to_string()
            }
        );
        assert!(!parsed.verified);

        let json = r#"{"type":"path","pattern":"/r/{code}"}"#;
        let kind: PatternKind = serde_json::from_str(json).unwrap();
        assert_eq!(
            kind,
            PatternKind::Path {
                pattern: "/r/{code}".to_string()
            }
        );
    }

    #[test]
    fn test_new_rejects_unusable_patterns() {
        let mut missing_placeholder = path_pattern("NoCode", "a.example");
        missing_placeholder.pattern = PatternKind::Path {
            pattern: "/affiliate".to_string(),
        };
        assert!(matches!(
            PatternRegistry::new(vec![missing_placeholder]),
            Err(CatalogError::InvalidPattern { .. })
        ));

        let mut empty_param = path_pattern("NoParam", "b.example");
        empty_param.pattern = PatternKind::Query {
            param: " ".to_string(),
        };
        assert!(PatternRegistry::new(vec![empty_param]).is_err());

        let mut no_domains = path_pattern("NoDomains", "");
        no_domains.domains.clear();
        assert!(PatternRegistry::new(vec![no_domains]).is_err());
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let builtin = builtin_patterns();
        assert!(!builtin.is_empty());
        assert!(PatternRegistry::new(builtin).is_ok());
    }

    #[test]
    fn test_is_verified_url() {
        let mut unverified = path_pattern("Unverified", "sketchy.example");
        unverified.verified = false;
        let registry =
            PatternRegistry::new(vec![path_pattern("Good", "good.example"), unverified]).unwrap();
        assert!(registry.is_verified_url("https://good.example/p"));
        assert!(!registry.is_verified_url("https://sketchy.example/p"));
        assert!(!registry.is_verified_url("https://other.example/p"));
    }
}
