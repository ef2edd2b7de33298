use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::{AppState, routes::health::model::HealthResponse, utils::success_to_api_response};

/// 健康检查接口
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    (
        StatusCode::OK,
        success_to_api_response(HealthResponse {
            status: "ok".to_string(),
            timestamp: now.timestamp(),
            durable_store_available: state.limiter.durable_store_available(),
            rate_limit_entries: state.limiter.active_entry_count(),
            cache: state.analytics.get_stats(),
        }),
    )
}
