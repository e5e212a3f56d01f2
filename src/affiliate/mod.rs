//! Affiliate attribution.
//!
//! - [`AffiliateCode`]: validated code newtype
//! - [`AttributionStore`]: where the attributed code is persisted between requests
//! - [`AffiliateResolver`]: picks the code for a request by precedence
//! - [`AffiliateAccounts`]: generation of new codes with one-time secrets

mod accounts;
mod code;
mod resolver;
mod store;

pub use accounts::{AffiliateAccounts, AffiliateRecord, GeneratedAffiliate};
pub use code::{is_valid_code, AffiliateCode};
pub use resolver::{AffiliateResolver, AttributionRequest, CodeSource, Resolution};
pub use store::{AttributionStore, CookieAttributionStore, MemoryAttributionStore};
