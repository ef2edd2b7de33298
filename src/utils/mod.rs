use axum::Json;
use serde::Serialize;

use crate::result::ApiResponse;

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

pub fn error_to_api_response<T: Serialize>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse::error(code, msg))
}

/// 把重试等待秒数格式化为可读文本：不少于60秒按分钟（向上取整），否则按秒
pub fn format_wait_time(retry_after_seconds: u64) -> String {
    if retry_after_seconds >= 60 {
        format!("{}分钟", retry_after_seconds.div_ceil(60))
    } else {
        format!("{}秒", retry_after_seconds)
    }
}

/// 限流提示信息
pub fn format_retry_message(retry_after_seconds: u64) -> String {
    format!(
        "请求过于频繁，请在{}后重试",
        format_wait_time(retry_after_seconds)
    )
}

pub mod error_codes {
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
}
