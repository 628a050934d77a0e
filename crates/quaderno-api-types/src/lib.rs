//! Wire types for the visitor-analytics API.
//!
//! Field names follow the JSON the site's tracking script already speaks,
//! so everything is camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Arbitrary client-supplied fields posted to `/api/track`.
pub type TrackRequest = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackResponse {
    pub success: bool,
}

impl TrackResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopPage {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentVisitor {
    pub ip: String,
    /// Absent when the tracked event carried no string `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_views: u64,
    #[serde(rename = "distinctIPs")]
    pub distinct_ips: u64,
    pub unique_visitors: u64,
    pub top_page: String,
    pub top_pages: Vec<TopPage>,
    pub recent_visitors: Vec<RecentVisitor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
