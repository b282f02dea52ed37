pub mod health;
pub mod locate;
pub mod types;

pub use health::{AppStartTime, HealthService, RateLimitEnabled, health_routes};
pub use locate::{LocateService, home_routes};
