//! Twitch Helix REST API client.
//!
//! Provides typed access to the Helix endpoints this application needs
//! (EventSub subscriptions, followed channels/streams, schedules) with
//! Bearer token + Client-ID header injection.

mod channels;
mod eventsub;
mod request;
mod schedule;
mod streams;

pub mod models;

pub use eventsub::{CreateSubscriptionRequest, WebhookTransport};
pub use models::{
    BroadcastSchedule, EventSubCondition, EventSubSubscription, EventSubSubscriptionList,
    EventSubTransport, FollowedChannel, FollowedChannelsPage, HelixPaginatedResponse,
    HelixPagination, ScheduleCategory, ScheduleData, ScheduleSegment, StreamInfo,
};

use url::Url;

use crate::TwitchError;

const HELIX_BASE: &str = "https://api.twitch.tv";

/// Twitch Helix API client with automatic auth header injection.
#[derive(Clone)]
pub struct TwitchApiClient {
    pub(super) http: reqwest::Client,
    pub(super) client_id: String,
    pub(super) base_url: String,
}

impl TwitchApiClient {
    fn helix_url(&self, path: &str) -> String {
        format!("{}/helix{path}", self.base_url)
    }

    /// Helix URL with percent-encoded query parameters.
    fn helix_query_url(&self, path: &str, query: &[(&str, &str)]) -> Result<String, TwitchError> {
        let mut url = Url::parse(&self.helix_url(path))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url.into())
    }
}
