//! Service layer
//!
//! Lookup and rate limiting logic shared by the HTTP API and the CLI.

pub mod geoip;
pub mod rate_limit;

pub use geoip::{Language, LocationRecord, LookupService, RawRecord};
pub use rate_limit::RateLimiterRegistry;
