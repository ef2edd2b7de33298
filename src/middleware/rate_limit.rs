use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{AppState, cache::RateLimitDecision, error::AppError};

/// 代理可能写入客户端地址的请求头，按优先级排列
const CLIENT_IP_HEADERS: [&str; 4] = [
    "x-forwarded-for",
    "x-real-ip",
    "cf-connecting-ip",
    "x-client-ip",
];

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// 中间件解析出的客户端 IP，放入请求扩展供处理函数使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// 解析客户端 IP
///
/// x-forwarded-for 取第一个非空元素；请求头都没有时用连接地址，再没有则为 "unknown"。
pub fn client_ip(headers: &HeaderMap, remote: Option<IpAddr>) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        .map(str::to_string)
        .or_else(|| remote.map(|ip| ip.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// 写入 X-RateLimit-* 响应头，已存在的不覆盖；被拒绝时同时写入 Retry-After
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers
        .entry(X_RATELIMIT_LIMIT)
        .or_insert_with(|| HeaderValue::from(decision.limit));
    headers
        .entry(X_RATELIMIT_REMAINING)
        .or_insert_with(|| HeaderValue::from(decision.remaining));
    headers
        .entry(X_RATELIMIT_RESET)
        .or_insert_with(|| HeaderValue::from(decision.reset_at.timestamp()));
    if !decision.allowed {
        headers
            .entry(RETRY_AFTER)
            .or_insert_with(|| HeaderValue::from(decision.retry_after_seconds));
    }
}

/// 全局按 IP 限流
pub async fn rate_limit(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let ip = client_ip(req.headers(), remote_ip);

    let decision = state
        .limiter
        .check_and_consume(&ip, &state.global_policy)
        .await;

    let mut response = match decision.retry_message() {
        Some(message) => {
            warn!(
                ip = %ip,
                retry_after = decision.retry_after_seconds,
                "global rate limit exceeded"
            );
            AppError::RateLimited {
                message,
                retry_after_seconds: decision.retry_after_seconds,
            }
            .into_response()
        }
        None => {
            req.extensions_mut().insert(ClientIp(ip));
            next.run(req).await
        }
    };

    apply_rate_limit_headers(response.headers_mut(), &decision);
    response
}
