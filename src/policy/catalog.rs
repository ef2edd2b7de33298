use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RateLimitPolicy;

const MINUTE: Duration = Duration::from_secs(60);
const QUARTER_HOUR: Duration = Duration::from_secs(15 * 60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// 限流标识的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Ip,
    Query,
}

/// 操作的一道限流关卡
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    pub scope: Scope,
    pub policy: RateLimitPolicy,
}

impl Gate {
    fn new(scope: Scope, namespace: &'static str, window: Duration, max_requests: u32) -> Self {
        Self {
            scope,
            policy: RateLimitPolicy::new(namespace, window, max_requests),
        }
    }
}

/// 需要限流的操作
///
/// 所有写操作、可被外部触发的操作以及会调用第三方服务的操作都必须至少经过一道限流；
/// 评论类操作同时按用户和 IP 限流。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    SignIn,
    CommentCreate,
    CommentUpdate,
    CommentDelete,
    ProfileUpdate,
    PasswordChange,
    EmailChange,
    Search,
    AnalyticsIngest,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::SignIn,
        Operation::CommentCreate,
        Operation::CommentUpdate,
        Operation::CommentDelete,
        Operation::ProfileUpdate,
        Operation::PasswordChange,
        Operation::EmailChange,
        Operation::Search,
        Operation::AnalyticsIngest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::SignIn => "sign-in",
            Operation::CommentCreate => "comment-create",
            Operation::CommentUpdate => "comment-update",
            Operation::CommentDelete => "comment-delete",
            Operation::ProfileUpdate => "profile-update",
            Operation::PasswordChange => "password-change",
            Operation::EmailChange => "email-change",
            Operation::Search => "search",
            Operation::AnalyticsIngest => "analytics-ingest",
        }
    }

    /// 按顺序检查的关卡，任意一道拒绝即拒绝
    pub fn gates(self) -> Vec<Gate> {
        match self {
            Operation::SignIn => vec![Gate::new(Scope::Ip, "auth:signin", QUARTER_HOUR, 5)],
            Operation::CommentCreate => vec![
                Gate::new(Scope::User, "comment:create:user", QUARTER_HOUR, 5),
                Gate::new(Scope::Ip, "comment:create:ip", QUARTER_HOUR, 10),
            ],
            Operation::CommentUpdate => vec![
                Gate::new(Scope::User, "comment:update:user", QUARTER_HOUR, 10),
                Gate::new(Scope::Ip, "comment:update:ip", QUARTER_HOUR, 15),
            ],
            Operation::CommentDelete => vec![
                Gate::new(Scope::User, "comment:delete:user", QUARTER_HOUR, 5),
                Gate::new(Scope::Ip, "comment:delete:ip", QUARTER_HOUR, 8),
            ],
            Operation::ProfileUpdate => {
                vec![Gate::new(Scope::User, "profile:update", HOUR, 10)]
            }
            Operation::PasswordChange => {
                vec![Gate::new(Scope::User, "profile:password", HOUR, 5)]
            }
            Operation::EmailChange => vec![Gate::new(Scope::User, "profile:email", DAY, 3)],
            Operation::Search => vec![
                Gate::new(Scope::Ip, "search:ip", MINUTE, 30),
                Gate::new(Scope::Query, "search:query", MINUTE, 10),
            ],
            Operation::AnalyticsIngest => {
                vec![Gate::new(Scope::Ip, "analytics:ingest", HOUR, 1000)]
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// 调用方身份
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub ip: String,
    pub user_id: Option<String>,
    pub query: Option<String>,
}

impl Identity {
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// 取出某个范围的限流标识
    ///
    /// 未登录时用户关卡退回到 IP；搜索词去掉首尾空白并转小写，为空时同样退回到 IP，
    /// 不同调用方不会共用一个空搜索词的计数。
    pub fn identifier_for(&self, scope: Scope) -> String {
        match scope {
            Scope::Ip => self.ip.clone(),
            Scope::User => self
                .user_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| self.ip.clone()),
            Scope::Query => self
                .query
                .as_deref()
                .map(str::trim)
                .filter(|query| !query.is_empty())
                .map(str::to_lowercase)
                .unwrap_or_else(|| self.ip.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn namespaces_are_unique_across_the_catalog() {
        let mut seen = HashSet::new();
        for op in Operation::ALL {
            for gate in op.gates() {
                assert!(
                    seen.insert(gate.policy.namespace().to_string()),
                    "duplicate namespace {}",
                    gate.policy.namespace()
                );
            }
        }
    }

    #[test]
    fn every_operation_has_at_least_one_gate() {
        for op in Operation::ALL {
            assert!(!op.gates().is_empty(), "{} is not guarded", op);
        }
    }

    #[test]
    fn comment_operations_are_checked_by_user_and_ip() {
        for op in [
            Operation::CommentCreate,
            Operation::CommentUpdate,
            Operation::CommentDelete,
        ] {
            let scopes: Vec<_> = op.gates().iter().map(|gate| gate.scope).collect();
            assert_eq!(scopes, vec![Scope::User, Scope::Ip]);
        }
    }

    #[test]
    fn catalog_limits_match_configuration() {
        let sign_in = &Operation::SignIn.gates()[0].policy;
        assert_eq!(sign_in.max_requests(), 5);
        assert_eq!(sign_in.window(), Duration::from_secs(900));

        let email = &Operation::EmailChange.gates()[0].policy;
        assert_eq!(email.max_requests(), 3);
        assert_eq!(email.window(), Duration::from_secs(86_400));

        let ingest = &Operation::AnalyticsIngest.gates()[0].policy;
        assert_eq!(ingest.max_requests(), 1000);
    }

    #[test]
    fn operation_names_parse_back() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>(), Ok(op));
        }
        assert!("upload".parse::<Operation>().is_err());
    }

    #[test]
    fn identifiers_fall_back_and_normalize() {
        let anonymous = Identity::from_ip("10.0.0.1").with_query("  Naruto ");
        assert_eq!(anonymous.identifier_for(Scope::User), "10.0.0.1");
        assert_eq!(anonymous.identifier_for(Scope::Query), "naruto");

        let user = Identity::from_ip("10.0.0.1").with_user("u1");
        assert_eq!(user.identifier_for(Scope::User), "u1");
    }

    #[test]
    fn blank_query_falls_back_to_ip() {
        assert_eq!(Identity::from_ip("10.0.0.2").identifier_for(Scope::Query), "10.0.0.2");
        let blank = Identity::from_ip("10.0.0.3").with_query("   ");
        assert_eq!(blank.identifier_for(Scope::Query), "10.0.0.3");
    }
}
