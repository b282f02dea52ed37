//! 定位接口
//!
//! - `/`、`/json`、`/en`、`/en/json`：查询调用方自身的 IP
//! - `/v1/report?ip=`：返回原始记录

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::{debug, info};

use super::types::{client_error, error_from_ip2loc, reason, success_response};
use crate::services::geoip::{Language, LocationRecord, LookupService};
use crate::utils::client_identity;

/// 首页支持的路径
pub const HOME_PATHS: [&str; 4] = ["/", "/json", "/en", "/en/json"];

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub ip: Option<String>,
}

pub struct LocateService;

impl LocateService {
    pub async fn home(req: HttpRequest, lookup: web::Data<Arc<LookupService>>) -> impl Responder {
        let path = req.path();
        let ip = client_identity(&req);
        if LookupService::parse_ip(&ip).is_err() {
            info!("given ip is {}, which is not valid", ip);
            return client_error(StatusCode::BAD_REQUEST, reason(StatusCode::BAD_REQUEST));
        }

        let language = if path.contains("en") {
            Language::En
        } else {
            Language::ZhCn
        };

        let info = match lookup.lookup(&ip, language) {
            Ok(info) => info,
            Err(e) => return error_from_ip2loc(&e),
        };

        if path.contains("json") {
            success_response(&ip, info)
        } else {
            HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body(render_text(&ip, &info, language))
        }
    }

    pub async fn report(
        req: HttpRequest,
        query: web::Query<ReportQuery>,
        lookup: web::Data<Arc<LookupService>>,
    ) -> impl Responder {
        let ip = match query.into_inner().ip.filter(|ip| !ip.is_empty()) {
            Some(ip) => ip,
            None => client_identity(&req),
        };
        if LookupService::parse_ip(&ip).is_err() {
            info!("given ip is {}, which is not valid", ip);
            return client_error(StatusCode::NOT_FOUND, "please enter the right ip");
        }

        match lookup.report(&ip) {
            Ok(record) => success_response(&ip, record),
            Err(e) => error_from_ip2loc(&e),
        }
    }

    pub async fn not_found(req: HttpRequest) -> impl Responder {
        debug!("No route for {}", req.path());
        client_error(StatusCode::NOT_FOUND, reason(StatusCode::NOT_FOUND))
    }
}

/// 纯文本输出
pub fn render_text(ip: &str, info: &LocationRecord, language: Language) -> String {
    let location = format!("{} {} {}", info.country, info.region, info.city);
    match language {
        Language::En => format!(
            "Your IP: {}\tLocation: {}\tIsp: {}\tUserType: {}\n",
            ip, location, info.isp, info.user_type
        ),
        Language::ZhCn => format!(
            "当前 IP：{}\t来自于：{}\t运营商：{}\t用户类型：{}\n",
            ip, location, info.isp, info.user_type
        ),
    }
}

/// 首页路由（限流由调用方包裹）
pub fn home_routes() -> actix_web::Scope {
    HOME_PATHS
        .iter()
        .fold(web::scope(""), |scope, path| {
            scope.route(*path, web::to(LocateService::home))
        })
        .default_service(web::to(LocateService::not_found))
}
