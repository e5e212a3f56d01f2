//! Validated affiliate codes.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::config::{AFFILIATE_CODE_MAX_LEN, AFFILIATE_CODE_MIN_LEN};
use crate::error_handling::AffiliateError;

/// Accepted code format: letters, digits, `_` or `-`, within the configured
/// length bounds (3-20).
static CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^[A-Za-z0-9_-]{{{AFFILIATE_CODE_MIN_LEN},{AFFILIATE_CODE_MAX_LEN}}}$"
    ))
    .expect("affiliate code pattern is a valid regex")
});

/// An identifier attributing a visitor (and their purchases) to a referrer.
///
/// Codes coming from users are checked with [`AffiliateCode::parse`]. Codes read
/// back from an attribution store were validated when they were written and
/// are wrapped with [`AffiliateCode::trusted`] without re-checking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AffiliateCode(String);

impl AffiliateCode {
    /// Validates a user-supplied code.
    ///
    /// Surrounding whitespace is ignored; anything else outside the accepted
    /// format is rejected rather than coerced.
    pub fn parse(raw: &str) -> Result<Self, AffiliateError> {
        let trimmed = raw.trim();
        if is_valid_code(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(AffiliateError::InvalidCodeFormat(raw.to_string()))
        }
    }

    /// Wraps a previously persisted value as-is.
    pub fn trusted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Returns whether `candidate` matches the affiliate code format.
pub fn is_valid_code(candidate: &str) -> bool {
    CODE_PATTERN.is_match(candidate)
}

impl fmt::Display for AffiliateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AffiliateCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for AffiliateCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_valid_codes() {
        for code in ["abc", "abc123", "Key_Empire-01", "a1b2c3d4e5f6g7h8i9j0"] {
            assert_eq!(AffiliateCode::parse(code).unwrap().as_str(), code);
        }
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(AffiliateCode::parse("  abc123 ").unwrap().as_str(), "abc123");
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!(AffiliateCode::parse("ab").is_err());
        assert!(AffiliateCode::parse("").is_err());
        assert!(AffiliateCode::parse("a1b2c3d4e5f6g7h8i9j0k").is_err());
    }

    #[test]
    fn test_length_bounds_follow_constants() {
        assert!(AffiliateCode::parse(&"a".repeat(AFFILIATE_CODE_MIN_LEN)).is_ok());
        assert!(AffiliateCode::parse(&"a".repeat(AFFILIATE_CODE_MAX_LEN)).is_ok());
        assert!(AffiliateCode::parse(&"a".repeat(AFFILIATE_CODE_MIN_LEN - 1)).is_err());
        assert!(AffiliateCode::parse(&"a".repeat(AFFILIATE_CODE_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_characters() {
        for code in ["abc def", "abc!", "abc/def", "ab.cd", "çode", "abc%20"] {
            assert_eq!(
                AffiliateCode::parse(code),
                Err(AffiliateError::InvalidCodeFormat(code.to_string())),
                "{code:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_trusted_skips_validation() {
        let code = AffiliateCode::trusted("legacy code!");
        assert_eq!(code.as_str(), "legacy code!");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let code = AffiliateCode::parse("abc123").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"abc123\"");
    }
}
