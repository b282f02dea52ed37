//! 每客户端限流

mod registry;

pub use registry::{ClientLimiter, RateLimiterRegistry};
