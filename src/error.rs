use std::time::Duration;

use axum::{
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// 持久存储（Redis）错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("durable store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl StoreError {
    /// 连接类错误意味着存储不可用，应当降级到内存
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Timeout(_) => true,
            StoreError::Redis(e) => {
                e.is_io_error()
                    || e.is_timeout()
                    || e.is_connection_dropped()
                    || e.is_connection_refusal()
            }
        }
    }
}

/// 限流策略参数非法，属于编程错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("rate limit window must be greater than zero")]
    ZeroWindow,
    #[error("max requests must be greater than zero")]
    ZeroMaxRequests,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid global rate limit: {0}")]
    GlobalPolicy(#[from] PolicyError),
    #[error("invalid redis configuration: {0}")]
    Redis(#[from] StoreError),
}

#[derive(Debug)]
pub enum AppError {
    RateLimited {
        message: String,
        retry_after_seconds: u64,
    },
    UnknownOperation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::RateLimited {
                message,
                retry_after_seconds,
            } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    error_to_api_response::<()>(error_codes::RATE_LIMIT, message),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_seconds));
                response
            }
            AppError::UnknownOperation(name) => (
                StatusCode::NOT_FOUND,
                error_to_api_response::<()>(error_codes::NOT_FOUND, format!("未知的操作: {}", name)),
            )
                .into_response(),
        }
    }
}
