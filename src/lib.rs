//! ip2loc - IP geolocation over a hot-reloadable MaxMind DB file
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: One-shot command-line lookups
//!
//! # Architecture
//! - `services::geoip`: database handles, atomic slot, lookup + localization
//! - `services::rate_limit`: per-client token bucket registry
//! - `system::reload`: file watch supervisor that swaps the active handle
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes

#[cfg(feature = "server")]
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
#[cfg(feature = "server")]
pub mod runtime;
pub mod services;
pub mod system;
pub mod utils;
