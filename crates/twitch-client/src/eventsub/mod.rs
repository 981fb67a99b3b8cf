//! EventSub webhook message model.
//!
//! Twitch delivers EventSub messages to a public HTTPS callback. Each call
//! carries four `Twitch-Eventsub-Message-*` headers and a JSON body whose
//! shape depends on the message type. Signature computation lives in
//! [`signature`].

mod signature;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::EventSubCondition;

pub use signature::{compute_signature, verify_signature};

pub const HEADER_MESSAGE_ID: &str = "Twitch-Eventsub-Message-Id";
pub const HEADER_MESSAGE_TYPE: &str = "Twitch-Eventsub-Message-Type";
pub const HEADER_MESSAGE_TIMESTAMP: &str = "Twitch-Eventsub-Message-Timestamp";
pub const HEADER_MESSAGE_SIGNATURE: &str = "Twitch-Eventsub-Message-Signature";

/// Event types this application subscribes to.
pub const EVENT_STREAM_ONLINE: &str = "stream.online";
pub const EVENT_STREAM_OFFLINE: &str = "stream.offline";
pub const EVENT_CHANNEL_UPDATE: &str = "channel.update";

/// Value of the `Twitch-Eventsub-Message-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    WebhookCallbackVerification,
    Notification,
    Revocation,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebhookCallbackVerification => "webhook_callback_verification",
            Self::Notification => "notification",
            Self::Revocation => "revocation",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown Twitch EventSub event type: {0}")]
pub struct UnknownMessageType(pub String);

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webhook_callback_verification" => Ok(Self::WebhookCallbackVerification),
            "notification" => Ok(Self::Notification),
            "revocation" => Ok(Self::Revocation),
            other => Err(UnknownMessageType(other.to_string())),
        }
    }
}

/// `subscription` object of a webhook body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookSubscription {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub subscription_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub condition: EventSubCondition,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub transport: Value,
    #[serde(default)]
    pub cost: u32,
}

/// Webhook body. `challenge` is only set for verification messages and
/// `event` only for notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub subscription: WebhookSubscription,
    #[serde(default)]
    pub event: Option<Value>,
}

impl WebhookPayload {
    fn event_str(&self, key: &str) -> Option<&str> {
        self.event
            .as_ref()
            .and_then(|e| e.get(key))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Broadcaster id from the subscription condition, falling back to the event.
    pub fn broadcaster_user_id(&self) -> Option<&str> {
        self.subscription
            .condition
            .broadcaster_user_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .or_else(|| self.event_str("broadcaster_user_id"))
    }

    pub fn broadcaster_user_name(&self) -> Option<&str> {
        self.event_str("broadcaster_user_name")
    }

    /// Upstream event id. `channel.update` events carry none.
    pub fn event_id(&self) -> Option<&str> {
        self.event_str("id")
    }
}

/// `stream.online` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOnlineEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    #[serde(rename = "type", default)]
    pub stream_type: String,
    #[serde(default)]
    pub started_at: Option<String>,
}

/// `stream.offline` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOfflineEvent {
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
}

/// `channel.update` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelUpdateEvent {
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub content_classification_labels: Vec<String>,
}
