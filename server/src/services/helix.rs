//! Helix collaborator seam and its read-through caches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use twitch_client::TwitchError;
use twitch_client::api::{
    BroadcastSchedule, CreateSubscriptionRequest, EventSubSubscription, FollowedChannel,
    ScheduleSegment, StreamInfo, TwitchApiClient,
};

use notifier_db::SubscriptionType;

use super::cache::CacheStore;

const HOUR: Duration = Duration::from_secs(3600);
pub const FOLLOWED_CHANNELS_TTL: Duration = Duration::from_secs(7 * 24 * 3600);
pub const FOLLOWED_STREAMS_TTL: Duration = HOUR;
pub const BROADCAST_SCHEDULE_TTL: Duration = Duration::from_secs(2 * 3600);
const SCHEDULE_LOOKUP_CONCURRENCY: usize = 4;

/// Outbound Twitch API calls the notifier depends on.
///
/// Every call takes the bearer token to use: EventSub and schedule calls
/// need the app token, followed channels/streams the user token.
#[async_trait]
pub trait HelixApi: Send + Sync {
    async fn fetch_subscriptions(
        &self,
        app_token: &str,
        broadcaster_id: Option<&str>,
    ) -> Result<Vec<EventSubSubscription>, TwitchError>;

    async fn create_subscription(
        &self,
        app_token: &str,
        broadcaster_id: &str,
        subscription_type: SubscriptionType,
    ) -> Result<EventSubSubscription, TwitchError>;

    async fn delete_subscription(&self, app_token: &str, subscription_id: &str) -> Result<(), TwitchError>;

    /// Every followed channel, all pages merged.
    async fn get_followed_streamers(
        &self,
        user_token: &str,
        user_id: &str,
    ) -> Result<Vec<FollowedChannel>, TwitchError>;

    /// Live streams among the channels the user follows.
    async fn get_status_of_followed_streamers(
        &self,
        user_token: &str,
        user_id: &str,
    ) -> Result<Vec<StreamInfo>, TwitchError>;

    /// `None` when the broadcaster has no schedule.
    async fn get_broadcast_schedule(
        &self,
        app_token: &str,
        broadcaster_id: &str,
    ) -> Result<Option<BroadcastSchedule>, TwitchError>;
}

/// `HelixApi` over the real Helix REST client.
#[derive(Clone)]
pub struct TwitchHelix {
    api: TwitchApiClient,
    callback_url: String,
    secret: String,
}

impl TwitchHelix {
    pub fn new(api: TwitchApiClient, callback_url: String, secret: String) -> Self {
        Self {
            api,
            callback_url,
            secret,
        }
    }
}

#[async_trait]
impl HelixApi for TwitchHelix {
    async fn fetch_subscriptions(
        &self,
        app_token: &str,
        broadcaster_id: Option<&str>,
    ) -> Result<Vec<EventSubSubscription>, TwitchError> {
        let list = self
            .api
            .get_eventsub_subscriptions(app_token, broadcaster_id)
            .await?;
        Ok(list.data)
    }

    async fn create_subscription(
        &self,
        app_token: &str,
        broadcaster_id: &str,
        subscription_type: SubscriptionType,
    ) -> Result<EventSubSubscription, TwitchError> {
        let request = CreateSubscriptionRequest::webhook(
            subscription_type.as_str(),
            broadcaster_id,
            &self.callback_url,
            &self.secret,
        );
        let created = self.api.create_eventsub_subscription(app_token, &request).await?;
        created.data.into_iter().next().ok_or_else(|| TwitchError::ApiError {
            status: 502,
            message: "subscription create returned no data".into(),
        })
    }

    async fn delete_subscription(&self, app_token: &str, subscription_id: &str) -> Result<(), TwitchError> {
        self.api
            .delete_eventsub_subscription(app_token, subscription_id)
            .await
    }

    async fn get_followed_streamers(
        &self,
        user_token: &str,
        user_id: &str,
    ) -> Result<Vec<FollowedChannel>, TwitchError> {
        let all = self.api.get_all_followed_channels(user_token, user_id).await?;
        Ok(all.data)
    }

    async fn get_status_of_followed_streamers(
        &self,
        user_token: &str,
        user_id: &str,
    ) -> Result<Vec<StreamInfo>, TwitchError> {
        let streams = self.api.get_followed_streams(user_token, user_id).await?;
        Ok(streams.data)
    }

    async fn get_broadcast_schedule(
        &self,
        app_token: &str,
        broadcaster_id: &str,
    ) -> Result<Option<BroadcastSchedule>, TwitchError> {
        self.api.get_broadcast_schedule(app_token, broadcaster_id).await
    }
}

/// A broadcaster's next upcoming stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledStream {
    pub broadcaster_id: String,
    pub broadcaster_login: String,
    pub broadcaster_name: String,
    pub segment: ScheduleSegment,
}

/// Read-through caches over a `HelixApi`.
#[derive(Clone)]
pub struct CachedHelix {
    inner: Arc<dyn HelixApi>,
    cache: CacheStore,
}

impl CachedHelix {
    pub fn new(inner: Arc<dyn HelixApi>, cache: CacheStore) -> Self {
        Self { inner, cache }
    }

    /// Uncached access for calls that must see live upstream state.
    pub fn api(&self) -> &Arc<dyn HelixApi> {
        &self.inner
    }

    pub async fn followed_channels(
        &self,
        user_token: &str,
        user_id: &str,
    ) -> Result<Vec<FollowedChannel>, TwitchError> {
        let key = format!("twitch.followed_channels.{user_id}");
        self.cache
            .remember(&key, FOLLOWED_CHANNELS_TTL, || {
                self.inner.get_followed_streamers(user_token, user_id)
            })
            .await
    }

    pub async fn followed_streams(
        &self,
        user_token: &str,
        user_id: &str,
        ttl: Duration,
    ) -> Result<Vec<StreamInfo>, TwitchError> {
        let key = format!("twitch.followed_streams.{user_id}");
        self.cache
            .remember(&key, ttl, || {
                self.inner.get_status_of_followed_streamers(user_token, user_id)
            })
            .await
    }

    /// Cached schedule. A broadcaster without one is remembered for half
    /// the usual TTL.
    pub async fn broadcast_schedule(
        &self,
        app_token: &str,
        broadcaster_id: &str,
    ) -> Result<Option<BroadcastSchedule>, TwitchError> {
        let key = format!("twitch.broadcast_schedule.{broadcaster_id}");
        if let Some(hit) = self.cache.get_as::<Option<BroadcastSchedule>>(&key) {
            return Ok(hit);
        }

        tracing::debug!(broadcaster_id, "Cache miss for broadcast schedule");
        let schedule = self
            .inner
            .get_broadcast_schedule(app_token, broadcaster_id)
            .await?;
        let (value, ttl) = match &schedule {
            Some(s) => (serde_json::to_value(s)?, BROADCAST_SCHEDULE_TTL),
            None => (serde_json::Value::Null, BROADCAST_SCHEDULE_TTL / 2),
        };
        self.cache.put(&key, value, ttl);
        Ok(schedule)
    }

    /// Next future, non-cancelled segment of each broadcaster, soonest first.
    ///
    /// Broadcasters whose schedule cannot be fetched are skipped.
    pub async fn scheduled_streams_for(
        &self,
        app_token: &str,
        broadcaster_ids: &[String],
    ) -> Vec<ScheduledStream> {
        let now = Utc::now();
        let lookups: Vec<_> = broadcaster_ids
            .iter()
            .map(|id| async move {
                match self.broadcast_schedule(app_token, id).await {
                    Ok(schedule) => schedule,
                    Err(e) => {
                        tracing::warn!(broadcaster_id = %id, "Failed to fetch schedule: {e}");
                        None
                    }
                }
            })
            .collect();
        let schedules: Vec<Option<BroadcastSchedule>> = stream::iter(lookups)
            .buffer_unordered(SCHEDULE_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut upcoming: Vec<(DateTime<Utc>, ScheduledStream)> = schedules
            .into_iter()
            .flatten()
            .filter_map(|schedule| next_segment(schedule, now))
            .collect();
        upcoming.sort_by_key(|(start, _)| *start);
        upcoming.into_iter().map(|(_, s)| s).collect()
    }
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn next_segment(
    schedule: BroadcastSchedule,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, ScheduledStream)> {
    let data = schedule.data;
    let (start, segment) = data
        .segments
        .unwrap_or_default()
        .into_iter()
        .filter(|s| s.canceled_until.is_none())
        .filter_map(|s| parse_time(&s.start_time).map(|t| (t, s)))
        .filter(|(t, _)| *t > now)
        .min_by_key(|(t, _)| *t)?;

    Some((
        start,
        ScheduledStream {
            broadcaster_id: data.broadcaster_id,
            broadcaster_login: data.broadcaster_login,
            broadcaster_name: data.broadcaster_name,
            segment,
        },
    ))
}

#[cfg(test)]
mod tests;
