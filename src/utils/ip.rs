//! 客户端标识提取
//!
//! 顺序：X-Forwarded-For -> X-Real-Ip -> Remote-Addr -> TCP 对端地址，
//! 取第一个非空值中逗号分隔的第一段并去除空白。

use std::net::SocketAddr;

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;

const IDENTITY_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "remote-addr"];

/// 从 HttpRequest 提取客户端标识
pub fn client_identity(req: &HttpRequest) -> String {
    client_identity_from(req.headers(), req.peer_addr())
}

/// 从请求头与对端地址提取客户端标识
pub fn client_identity_from(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = IDENTITY_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|h| h.to_str().ok())
            .filter(|v| !v.is_empty())
    });

    let raw = match forwarded {
        Some(value) => value.to_string(),
        None => peer.map(|addr| addr.ip().to_string()).unwrap_or_default(),
    };

    // X-Forwarded-For 可能带多个 IP
    raw.split(',').next().unwrap_or_default().trim().to_string()
}
