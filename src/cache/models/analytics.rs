use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 统计时间范围，固定集合，失效时按它逐个删除而不是扫描键空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        TimeRange::Day,
        TimeRange::Week,
        TimeRange::Month,
        TimeRange::Quarter,
        TimeRange::All,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
            TimeRange::All => "all",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeRange::ALL
            .into_iter()
            .find(|range| range.tag() == s)
            .ok_or_else(|| format!("unknown time range: {}", s))
    }
}

/// 文章排行条目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostSummary {
    pub post_id: String,
    pub title: String,
    pub views: u64,
}

/// 仪表盘统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_page_views: u64,
    pub unique_visitors: u64,
    pub total_posts: u64,
    pub total_comments: u64,
    pub top_posts: Vec<PostSummary>,
}

/// 正在被访问的页面
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageActivity {
    pub path: String,
    pub visitors: u64,
}

/// 实时统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RealtimeStats {
    pub active_visitors: u64,
    pub page_views_last_minute: u64,
    pub active_pages: Vec<PageActivity>,
}

/// 单篇文章统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostStats {
    pub post_id: String,
    pub views: u64,
    pub unique_visitors: u64,
    pub comments: u64,
    pub average_read_seconds: f64,
}

/// 来源统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferrerCount {
    pub source: String,
    pub visits: u64,
}

/// 全站统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteStats {
    pub total_page_views: u64,
    pub unique_visitors: u64,
    pub bounce_rate: f64,
    pub top_referrers: Vec<ReferrerCount>,
}
