//! System-level modules
//!
//! - Logging setup
//! - Database hot reload (file watch + atomic swap)

pub mod logging;
pub mod reload;
