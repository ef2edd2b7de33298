use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::{
    AppState,
    cache::RateLimitDecision,
    error::AppError,
    middleware::{ClientIp, apply_rate_limit_headers},
    policy::Operation,
    routes::rate_limit::model::{QuotaRequest, QuotaResponse},
    utils::success_to_api_response,
};

/// 检查并消耗一次操作配额
pub async fn consume_quota(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Json(request): Json<QuotaRequest>,
) -> Result<Response, AppError> {
    let operation: Operation = operation.parse().map_err(AppError::UnknownOperation)?;
    let identity = request.into_identity(&client_ip);
    let decision = state.limiter.guard(operation, &identity).await;

    if !decision.allowed {
        info!(%operation, ip = %identity.ip, "operation rate limited");
    }
    Ok(quota_response(operation, decision))
}

/// 查询操作剩余配额，不消耗
pub async fn peek_quota(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Query(request): Query<QuotaRequest>,
) -> Result<Response, AppError> {
    let operation: Operation = operation.parse().map_err(AppError::UnknownOperation)?;
    let identity = request.into_identity(&client_ip);
    let decision = state.limiter.peek_operation(operation, &identity).await;

    Ok(quota_response(operation, decision))
}

fn quota_response(operation: Operation, decision: RateLimitDecision) -> Response {
    let mut response = match decision.retry_message() {
        Some(message) => AppError::RateLimited {
            message,
            retry_after_seconds: decision.retry_after_seconds,
        }
        .into_response(),
        None => (
            StatusCode::OK,
            success_to_api_response(QuotaResponse {
                operation,
                decision: decision.clone(),
            }),
        )
            .into_response(),
    };

    apply_rate_limit_headers(response.headers_mut(), &decision);
    response
}
