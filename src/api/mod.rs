//! HTTP surface
//!
//! [`configure`] mounts every route on an actix `App`; the server mode and the
//! integration tests share it.

pub mod middleware;
pub mod services;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::Method;
use actix_web::{middleware::Condition, web};
use tracing::warn;

use crate::config::CorsConfig;
use crate::services::geoip::LookupService;
use crate::services::rate_limit::RateLimiterRegistry;
use crate::system::reload::ReloadSupervisor;
use middleware::RateLimit;
use services::{AppStartTime, LocateService, RateLimitEnabled, health_routes, home_routes};

/// Shared state injected into every worker
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<LookupService>,
    pub supervisor: Arc<ReloadSupervisor>,
    pub registry: Arc<RateLimiterRegistry>,
    pub rate_limit_enabled: bool,
    pub cors: CorsConfig,
    pub start_time: AppStartTime,
}

/// Register app data and routes
///
/// The home scope has an empty prefix and catches everything, so it must be
/// registered last.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::Data::new(state.lookup.clone()))
        .app_data(web::Data::new(state.supervisor.clone()))
        .app_data(web::Data::new(state.registry.clone()))
        .app_data(web::Data::new(RateLimitEnabled(state.rate_limit_enabled)))
        .app_data(web::Data::new(state.start_time.clone()))
        .service(health_routes())
        .service(
            web::resource("/v1/report")
                .wrap(build_cors(&state.cors))
                .route(web::get().to(LocateService::report))
                .route(web::head().to(LocateService::report)),
        )
        .service(home_routes().wrap(Condition::new(
            state.rate_limit_enabled,
            RateLimit::new(state.registry.clone()),
        )));
}

/// Startup-time CORS sanity check
pub fn validate_cors_config(cors_config: &CorsConfig) {
    if cors_config.allowed_origins.is_empty() {
        warn!(
            "cors.allowed_origins is empty, /v1/report will reject cross-origin requests. \
            Set allowed_origins explicitly or use '[\"*\"]' for any origin."
        );
    }
}

/// Build the CORS middleware for the report endpoint
pub fn build_cors(cors_config: &CorsConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec![Method::GET, Method::HEAD, Method::OPTIONS])
        .max_age(3600);

    if cors_config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        // Empty origins = same-origin only
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
