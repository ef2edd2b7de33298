use axum::{Router, routing::get};

use crate::{
    AppState,
    middleware::{log_errors, rate_limit},
    routes,
};

// 限流相关的路由
fn rate_limit_routes() -> Router<AppState> {
    Router::new().route(
        "/rate-limits/{operation}",
        get(routes::rate_limit::peek_quota).post(routes::rate_limit::consume_quota),
    )
}

/// 创建主路由，所有接口挂在 `api_base_uri` 下并经过全局 IP 限流
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health::health))
        .merge(rate_limit_routes());

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    // 添加日志中间件和限流中间件
    router
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
}
