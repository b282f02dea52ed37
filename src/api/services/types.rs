//! 响应信封

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::Ip2LocError;

/// 信封中的 code 字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResponseCode {
    Success = 1,
    ClientError = 2,
    ServerError = 3,
}

/// `{"code": 1|2|3, "msg": ..., "ip": ..., "data": ...}`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct JsonResponse<T> {
    pub code: i32,
    pub msg: String,
    pub ip: String,
    pub data: T,
}

/// 错误时 data 的结构
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MessageData {
    pub msg: String,
}

fn json_response<T: Serialize>(
    status: StatusCode,
    code: ResponseCode,
    msg: &str,
    ip: &str,
    data: T,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(JsonResponse {
            code: code as i32,
            msg: msg.to_string(),
            ip: ip.to_string(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(ip: &str, data: T) -> HttpResponse {
    json_response(StatusCode::OK, ResponseCode::Success, "success", ip, data)
}

/// 构建客户端错误响应
///
/// 外层 `msg` 固定为 "success"，错误类别只由 `code = 2` 表示，原因写在 `data.msg`。
pub fn client_error(status: StatusCode, msg: &str) -> HttpResponse {
    json_response(
        status,
        ResponseCode::ClientError,
        "success",
        "",
        MessageData {
            msg: msg.to_string(),
        },
    )
}

/// 构建服务端错误响应（细节只写日志，不返回给调用方）
pub fn server_error(err: &Ip2LocError) -> HttpResponse {
    error!("{} {}: {}", err.code(), err.error_type(), err.message());
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ResponseCode::ServerError,
        "error",
        "",
        MessageData {
            msg: reason(StatusCode::INTERNAL_SERVER_ERROR).to_string(),
        },
    )
}

/// 从 Ip2LocError 构建响应（自动区分客户端错误与服务端错误）
pub fn error_from_ip2loc(err: &Ip2LocError) -> HttpResponse {
    if err.is_client_error() {
        let status = err.http_status();
        client_error(status, reason(status))
    } else {
        server_error(err)
    }
}

/// 状态码的标准描述
pub fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}
