use serde::{Deserialize, Serialize};

use crate::{
    cache::RateLimitDecision,
    policy::{Identity, Operation},
};

/// 配额请求参数，`ip` 缺省时使用中间件解析出的客户端 IP
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRequest {
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub query: Option<String>,
}

impl QuotaRequest {
    pub fn into_identity(self, client_ip: &str) -> Identity {
        let ip = self
            .ip
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .unwrap_or_else(|| client_ip.to_string());

        Identity {
            ip,
            user_id: self.user_id,
            query: self.query,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub operation: Operation,
    #[serde(flatten)]
    pub decision: RateLimitDecision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_ip_overrides_client_ip() {
        let request = QuotaRequest {
            ip: Some(" 192.0.2.1 ".into()),
            ..Default::default()
        };
        assert_eq!(request.into_identity("10.0.0.1").ip, "192.0.2.1");
    }

    #[test]
    fn blank_ip_uses_client_ip() {
        let request = QuotaRequest {
            ip: Some("  ".into()),
            user_id: Some("u1".into()),
            query: None,
        };
        let identity = request.into_identity("10.0.0.1");
        assert_eq!(identity.ip, "10.0.0.1");
        assert_eq!(identity.user_id.as_deref(), Some("u1"));
    }
}
