use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    /// 未配置时只使用进程内存储
    pub redis_url: Option<String>,
    pub redis_timeout_ms: u64,
    pub redis_retry_interval_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub sweep_interval_secs: u64,
    pub sweep_window_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            redis_timeout_ms: 500,
            redis_retry_interval_secs: 30,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            sweep_interval_secs: 300,
            // 目录中最长的窗口为一天，清理窗口不能比它短
            sweep_window_secs: 86_400,
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            api_base_uri: "/api".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            redis_timeout_ms: parse_var("REDIS_TIMEOUT_MS", defaults.redis_timeout_ms)?,
            redis_retry_interval_secs: parse_secs_var(
                "REDIS_RETRY_INTERVAL_SECS",
                defaults.redis_retry_interval_secs,
            )?,
            rate_limit_window_secs: parse_secs_var(
                "RATE_LIMIT_WINDOW",
                defaults.rate_limit_window_secs,
            )?,
            rate_limit_requests: parse_var("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests)?,
            sweep_interval_secs: parse_secs_var("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs)?,
            sweep_window_secs: parse_secs_var("SWEEP_WINDOW_SECS", defaults.sweep_window_secs)?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            api_base_uri: env::var("API_BASE_URI").unwrap_or(defaults.api_base_uri),
        })
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }

    pub fn redis_retry_interval(&self) -> Duration {
        Duration::from_secs(self.redis_retry_interval_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn sweep_window(&self) -> Duration {
        Duration::from_secs(self.sweep_window_secs)
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

/// 秒数配置，兼容 "60s" 这种写法
fn parse_secs_var(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_secs(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_secs(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let trimmed = raw.trim();
    parse_value(key, trimmed.strip_suffix('s').unwrap_or(trimmed)).map_err(|_| {
        ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }
    })
}
