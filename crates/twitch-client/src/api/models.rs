use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelixPagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelixPaginatedResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<HelixPagination>,
}

/// Stream information from GET /helix/streams and /helix/streams/followed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: String,
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(rename = "type", default)]
    pub stream_type: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub is_mature: bool,
}

/// Followed channel entry from GET /helix/channels/followed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowedChannel {
    pub broadcaster_id: String,
    pub broadcaster_login: String,
    pub broadcaster_name: String,
    #[serde(default)]
    pub followed_at: String,
}

/// One page of GET /helix/channels/followed, or all pages merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FollowedChannelsPage {
    #[serde(default)]
    pub total: u64,
    pub data: Vec<FollowedChannel>,
    #[serde(default)]
    pub pagination: Option<HelixPagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSubCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcaster_user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSubTransport {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

/// EventSub subscription as listed or created through Helix.
///
/// `status` and `type` are kept as raw strings; mapping them to the
/// application's closed enums is up to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSubSubscription {
    pub id: String,
    pub status: String,
    #[serde(rename = "type")]
    pub subscription_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub condition: EventSubCondition,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub transport: EventSubTransport,
    #[serde(default)]
    pub cost: u32,
}

/// Response of GET/POST /helix/eventsub/subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSubSubscriptionList {
    pub data: Vec<EventSubSubscription>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub total_cost: u32,
    #[serde(default)]
    pub max_total_cost: u32,
    #[serde(default)]
    pub pagination: Option<HelixPagination>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSegment {
    pub id: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub canceled_until: Option<String>,
    #[serde(default)]
    pub category: Option<ScheduleCategory>,
    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleData {
    #[serde(default)]
    pub segments: Option<Vec<ScheduleSegment>>,
    pub broadcaster_id: String,
    pub broadcaster_name: String,
    pub broadcaster_login: String,
}

/// Response of GET /helix/schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastSchedule {
    pub data: ScheduleData,
}
