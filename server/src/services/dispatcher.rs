//! Routing of verified EventSub messages.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use twitch_client::eventsub::{
    ChannelUpdateEvent, MessageType, StreamOfflineEvent, StreamOnlineEvent, WebhookPayload,
};

use notifier_db::{
    Database, DbError, FavouriteStreamer, NewTwitchEvent, SubscriptionStatus, SubscriptionType,
};

use super::batching::{BatchError, BatchingEngine};
use crate::notification::{NotificationSink, PushMessage};

/// What the webhook endpoint should answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 200 with the challenge echoed as plain text.
    Challenge(String),
    /// 204 without body.
    Acknowledged,
}

/// Malformed messages, answered with 400.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown Twitch EventSub event type: {0}")]
    UnknownMessageType(String),

    #[error("Invalid Twitch EventSub payload: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Verification request without challenge")]
    MissingChallenge,
}

/// Failure inside a notification handler. Logged, never returned to Twitch.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Notification without event")]
    MissingEvent,

    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

fn epoch(timestamp: Option<&str>) -> Option<i64> {
    timestamp
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.timestamp())
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    db: Database,
    batching: BatchingEngine,
    sink: Arc<dyn NotificationSink>,
}

impl WebhookDispatcher {
    pub fn new(db: Database, batching: BatchingEngine, sink: Arc<dyn NotificationSink>) -> Self {
        Self { db, batching, sink }
    }

    pub fn batching(&self) -> &BatchingEngine {
        &self.batching
    }

    /// Handle one verified message.
    ///
    /// The message type is checked before the body is parsed. Notification
    /// handler failures are logged and still acknowledged.
    pub async fn dispatch(
        &self,
        message_type: &str,
        message_timestamp: Option<&str>,
        body: &[u8],
    ) -> Result<DispatchOutcome, DispatchError> {
        let message_type = MessageType::from_str(message_type)
            .map_err(|e| DispatchError::UnknownMessageType(e.0))?;
        let payload: WebhookPayload = serde_json::from_slice(body)?;

        match message_type {
            MessageType::WebhookCallbackVerification => {
                let challenge = payload
                    .challenge
                    .clone()
                    .ok_or(DispatchError::MissingChallenge)?;
                self.mark_favourites(&payload, SubscriptionStatus::WebhookCallbackVerificationPending);
                Ok(DispatchOutcome::Challenge(challenge))
            }
            MessageType::Revocation => {
                tracing::warn!(
                    subscription_id = %payload.subscription.id,
                    status = %payload.subscription.status,
                    "EventSub subscription revoked"
                );
                self.mark_favourites(&payload, SubscriptionStatus::AuthorizationRevoked);
                Ok(DispatchOutcome::Acknowledged)
            }
            MessageType::Notification => {
                if let Err(e) = self.handle_notification(&payload, message_timestamp).await {
                    tracing::error!(
                        subscription_type = %payload.subscription.subscription_type,
                        "EventSub notification handling failed: {e}"
                    );
                }
                Ok(DispatchOutcome::Acknowledged)
            }
        }
    }

    fn matching_favourites(&self, payload: &WebhookPayload) -> Result<Vec<FavouriteStreamer>, DbError> {
        let favourites = self
            .db
            .find_favourites_for_broadcaster(payload.broadcaster_user_id(), payload.broadcaster_user_name())?;
        if favourites.is_empty() {
            tracing::error!(
                broadcaster_user_id = ?payload.broadcaster_user_id(),
                "No favourite streamer found for EventSub message"
            );
        }
        Ok(favourites)
    }

    fn mark_favourites(&self, payload: &WebhookPayload, status: SubscriptionStatus) {
        let favourites = match self.matching_favourites(payload) {
            Ok(favourites) => favourites,
            Err(e) => {
                tracing::error!("Failed to look up favourites: {e}");
                return;
            }
        };
        for fav in favourites {
            if let Err(e) = self.db.set_favourite_status(fav.id, status) {
                tracing::error!(favourite_streamer_id = fav.id, "Failed to update status: {e}");
            }
        }
    }

    async fn handle_notification(
        &self,
        payload: &WebhookPayload,
        message_timestamp: Option<&str>,
    ) -> Result<(), EventError> {
        let event_type = match SubscriptionType::from_str(&payload.subscription.subscription_type) {
            Ok(t) => t,
            Err(_) => {
                tracing::warn!(
                    subscription_type = %payload.subscription.subscription_type,
                    "Ignoring unsupported EventSub notification"
                );
                return Ok(());
            }
        };
        let event = payload.event.clone().ok_or(EventError::MissingEvent)?;

        match event_type {
            SubscriptionType::StreamOnline => {
                let online: StreamOnlineEvent = serde_json::from_value(event.clone())?;
                let occurred_at = epoch(online.started_at.as_deref())
                    .or_else(|| epoch(message_timestamp))
                    .unwrap_or_else(|| Utc::now().timestamp());
                if !self.record(event_type, payload, event, occurred_at)? {
                    tracing::info!(event_id = ?online.id, "Duplicate stream.online ignored");
                    return Ok(());
                }
                self.stream_online(payload).await
            }
            SubscriptionType::StreamOffline => {
                let offline: StreamOfflineEvent = serde_json::from_value(event.clone())?;
                self.record(event_type, payload, event, Self::occurred_at(message_timestamp))?;
                tracing::info!(broadcaster = %offline.broadcaster_user_login, "Stream went offline");
                Ok(())
            }
            SubscriptionType::ChannelUpdate => {
                let update: ChannelUpdateEvent = serde_json::from_value(event.clone())?;
                self.record(event_type, payload, event, Self::occurred_at(message_timestamp))?;
                self.channel_update(payload, update).await
            }
        }
    }

    fn occurred_at(message_timestamp: Option<&str>) -> i64 {
        epoch(message_timestamp).unwrap_or_else(|| Utc::now().timestamp())
    }

    fn record(
        &self,
        event_type: SubscriptionType,
        payload: &WebhookPayload,
        event: Value,
        occurred_at: i64,
    ) -> Result<bool, DbError> {
        self.db.record_twitch_event(&NewTwitchEvent {
            event_id: payload.event_id().map(str::to_string),
            event_type: event_type.as_str().to_string(),
            streamer_id: payload.broadcaster_user_id().unwrap_or_default().to_string(),
            streamer_name: payload.broadcaster_user_name().unwrap_or_default().to_string(),
            payload: event,
            occurred_at,
        })
    }

    async fn stream_online(&self, payload: &WebhookPayload) -> Result<(), EventError> {
        for fav in self.matching_favourites(payload)? {
            self.db.set_favourite_status(fav.id, SubscriptionStatus::Enabled)?;
            let message = PushMessage::stream_started(&fav.streamer_name);
            if let Err(e) = self.sink.send(fav.user_id, message).await {
                tracing::error!(favourite_streamer_id = fav.id, "Stream start notification failed: {e}");
            }
        }
        Ok(())
    }

    async fn channel_update(
        &self,
        payload: &WebhookPayload,
        update: ChannelUpdateEvent,
    ) -> Result<(), EventError> {
        for fav in self.matching_favourites(payload)? {
            self.db.set_subscription_status(
                fav.id,
                SubscriptionType::ChannelUpdate,
                SubscriptionStatus::Enabled,
            )?;
            let batch_delay = self
                .db
                .get_subscription(fav.id, SubscriptionType::ChannelUpdate)?
                .and_then(|s| s.batch_delay);
            if let Err(e) = self
                .batching
                .handle_update(&fav, update.clone(), batch_delay)
                .await
            {
                tracing::error!(favourite_streamer_id = fav.id, "Channel update notification failed: {e}");
            }
        }
        Ok(())
    }
}
