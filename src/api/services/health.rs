use std::sync::Arc;

use actix_web::{Responder, web};
use serde::Serialize;
use tracing::trace;

use super::types::success_response;
use crate::services::rate_limit::RateLimiterRegistry;
use crate::system::reload::{ReloadStatus, ReloadSupervisor};

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: u64,
    pub database: DatabaseHealth,
    pub rate_limiter: RateLimiterHealth,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub path: String,
    pub opened_at: String,
    #[serde(flatten)]
    pub reload: ReloadStatus,
}

#[derive(Debug, Serialize)]
pub struct RateLimiterHealth {
    pub enabled: bool,
    pub entries: usize,
}

/// Health Service
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        supervisor: web::Data<Arc<ReloadSupervisor>>,
        registry: web::Data<Arc<RateLimiterRegistry>>,
        rate_limit_enabled: web::Data<RateLimitEnabled>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        let handle = supervisor.slot().load();
        let now = chrono::Utc::now();
        let uptime = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;

        let health = HealthResponse {
            status: "healthy",
            timestamp: now.to_rfc3339(),
            uptime,
            database: DatabaseHealth {
                path: handle.path().display().to_string(),
                opened_at: handle.opened_at().to_rfc3339(),
                reload: supervisor.status(),
            },
            rate_limiter: RateLimiterHealth {
                enabled: rate_limit_enabled.0,
                entries: registry.len(),
            },
        };

        success_response("", health)
    }
}

/// 是否启用了限流（作为 app_data 注入）
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEnabled(pub bool);

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
}
