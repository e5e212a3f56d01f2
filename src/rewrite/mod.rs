//! Outbound purchase link rewriting.
//!
//! Turns a reseller URL into the equivalent URL carrying an affiliate code:
//! - registered path pattern: the path is replaced by the template
//! - registered query pattern: the configured parameter is set
//! - unknown reseller: the generic `ref` parameter is set
//!
//! Existing affiliate parameters are overwritten, never duplicated, so
//! rewriting an already rewritten URL with another code swaps the code.
//! Rewriting fails open: anything that cannot be parsed as an http(s) URL is
//! returned unchanged.

use log::debug;
use url::{form_urlencoded, Url};

use crate::affiliate::AffiliateCode;
use crate::config::{CODE_PLACEHOLDER, FALLBACK_REF_PARAM};
use crate::registry::{PatternKind, PatternRegistry};

/// Rewrites `raw` so that it carries `code`.
pub fn rewrite_url(raw: &str, code: &AffiliateCode, registry: &PatternRegistry) -> String {
    let mut url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        Err(e) => {
            debug!("Leaving unparseable URL unchanged ({e}): {raw:?}");
            return raw.to_string();
        }
    };
    if !matches!(url.scheme(), "http" | "https") {
        debug!("Leaving non-http URL unchanged: {raw:?}");
        return raw.to_string();
    }

    let pattern = url
        .host_str()
        .and_then(|host| registry.lookup_host(host))
        .map(|entry| entry.pattern.clone());

    match pattern {
        Some(PatternKind::Path { pattern }) => {
            url.set_path(&pattern.replace(CODE_PLACEHOLDER, code.as_str()));
        }
        Some(PatternKind::Query { param }) => set_query_param(&mut url, &param, code.as_str()),
        None => set_query_param(&mut url, FALLBACK_REF_PARAM, code.as_str()),
    }

    url.to_string()
}

/// Sets `key=value`, dropping any previous values of `key`.
///
/// The raw query is edited segment by segment, so every other parameter keeps
/// its exact spelling (valueless flags, percent escapes) and its position.
fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut segments: Vec<String> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            !matches!(form_urlencoded::parse(segment.as_bytes()).next(), Some((k, _)) if k == key)
        })
        .map(str::to_string)
        .collect();

    segments.push(format!(
        "{}={}",
        form_urlencoded::byte_serialize(key.as_bytes()).collect::<String>(),
        form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>()
    ));
    url.set_query(Some(&segments.join("&")));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(c: &str) -> AffiliateCode {
        AffiliateCode::parse(c).unwrap()
    }

    #[test]
    fn test_path_pattern_replaces_path() {
        let registry = PatternRegistry::builtin();
        assert_eq!(
            rewrite_url("https://robloxcheatz.com/group/wave", &code("abc123"), &registry),
            "https://robloxcheatz.com/affiliate/abc123"
        );
    }

    #[test]
    fn test_path_pattern_keeps_query_and_fragment() {
        let registry = PatternRegistry::builtin();
        assert_eq!(
            rewrite_url(
                "https://bloxstore.gg/products/wave?variant=2#buy",
                &code("abc123"),
                &registry
            ),
            "https://bloxstore.gg/r/abc123?variant=2#buy"
        );
    }

    #[test]
    fn test_query_pattern_sets_param_preserving_others() {
        let registry = PatternRegistry::builtin();
        assert_eq!(
            rewrite_url(
                "https://keyempire.net/product/wave?plan=30#reviews",
                &code("abc123"),
                &registry
            ),
            "https://keyempire.net/product/wave?plan=30&affiliate=abc123#reviews"
        );
    }

    #[test]
    fn test_unknown_domain_gets_ref_param() {
        let registry = PatternRegistry::builtin();
        assert_eq!(
            rewrite_url("https://unknownshop.example/item/5", &code("abc123"), &registry),
            "https://unknownshop.example/item/5?ref=abc123"
        );
    }

    #[test]
    fn test_rewriting_with_new_code_replaces_old_one() {
        let registry = PatternRegistry::builtin();
        for url in [
            "https://unknownshop.example/item/5?color=red",
            "https://keyempire.net/product/wave",
            "https://robloxcheatz.com/group/wave",
        ] {
            let first = rewrite_url(url, &code("first1"), &registry);
            let second = rewrite_url(&first, &code("second2"), &registry);
            assert!(second.contains("second2"), "{second}");
            assert!(!second.contains("first1"), "{second}");
            assert_eq!(second.matches("second2").count(), 1, "{second}");
        }
    }

    #[test]
    fn test_rewriting_with_same_code_is_idempotent() {
        let registry = PatternRegistry::builtin();
        let once = rewrite_url("https://unknownshop.example/a?ref=x&b=1", &code("abc123"), &registry);
        let twice = rewrite_url(&once, &code("abc123"), &registry);
        assert_eq!(once, twice);
        assert_eq!(once, "https://unknownshop.example/a?b=1&ref=abc123");
    }

    #[test]
    fn test_duplicate_existing_params_collapse() {
        let registry = PatternRegistry::builtin();
        assert_eq!(
            rewrite_url("https://unknownshop.example/?ref=a&ref=b", &code("abc123"), &registry),
            "https://unknownshop.example/?ref=abc123"
        );
    }

    #[test]
    fn test_other_params_keep_their_raw_spelling() {
        let registry = PatternRegistry::builtin();
        assert_eq!(
            rewrite_url("https://unknownshop.example/item?flag&q=a%20b", &code("abc123"), &registry),
            "https://unknownshop.example/item?flag&q=a%20b&ref=abc123"
        );
        assert_eq!(
            rewrite_url(
                "https://keyempire.net/p?affiliate=old&q=a+b%2Bc#top",
                &code("abc123"),
                &registry
            ),
            "https://keyempire.net/p?q=a+b%2Bc&affiliate=abc123#top"
        );
    }

    #[test]
    fn test_unparseable_input_is_returned_unchanged() {
        let registry = PatternRegistry::builtin();
        for raw in ["", "not a url", "/relative/path", "mailto:sales@shop.example"] {
            assert_eq!(rewrite_url(raw, &code("abc123"), &registry), raw);
        }
    }
}
