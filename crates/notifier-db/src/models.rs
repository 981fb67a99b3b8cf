//! Closed value sets stored as TEXT/INTEGER columns.

use std::fmt;
use std::str::FromStr;

use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::DbError;

/// EventSub subscription types a favourite can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionType {
    #[serde(rename = "stream.online")]
    StreamOnline,
    #[serde(rename = "stream.offline")]
    StreamOffline,
    #[serde(rename = "channel.update")]
    ChannelUpdate,
}

impl SubscriptionType {
    pub const ALL: [SubscriptionType; 3] = [
        SubscriptionType::StreamOnline,
        SubscriptionType::StreamOffline,
        SubscriptionType::ChannelUpdate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StreamOnline => "stream.online",
            Self::StreamOffline => "stream.offline",
            Self::ChannelUpdate => "channel.update",
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream.online" => Ok(Self::StreamOnline),
            "stream.offline" => Ok(Self::StreamOffline),
            "channel.update" => Ok(Self::ChannelUpdate),
            other => Err(DbError::InvalidData(format!(
                "unknown subscription type: {other}"
            ))),
        }
    }
}

/// Subscription status, as reported by Twitch plus local lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Enabled,
    WebhookCallbackVerificationPending,
    WebhookCallbackVerificationFailed,
    NotificationFailuresExceeded,
    AuthorizationRevoked,
    UserRemoved,
    VersionRemoved,
    #[default]
    Unsubscribed,
    Pending,
    Failed,
    Suspended,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::WebhookCallbackVerificationPending => "webhook_callback_verification_pending",
            Self::WebhookCallbackVerificationFailed => "webhook_callback_verification_failed",
            Self::NotificationFailuresExceeded => "notification_failures_exceeded",
            Self::AuthorizationRevoked => "authorization_revoked",
            Self::UserRemoved => "user_removed",
            Self::VersionRemoved => "version_removed",
            Self::Unsubscribed => "unsubscribed",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Suspended => "suspended",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "enabled" => Self::Enabled,
            "webhook_callback_verification_pending" => Self::WebhookCallbackVerificationPending,
            "webhook_callback_verification_failed" => Self::WebhookCallbackVerificationFailed,
            "notification_failures_exceeded" => Self::NotificationFailuresExceeded,
            "authorization_revoked" => Self::AuthorizationRevoked,
            "user_removed" => Self::UserRemoved,
            "version_removed" => Self::VersionRemoved,
            "unsubscribed" => Self::Unsubscribed,
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            "suspended" => Self::Suspended,
            other => {
                return Err(DbError::InvalidData(format!(
                    "unknown subscription status: {other}"
                )));
            }
        };
        Ok(status)
    }
}

/// Debounce window for `channel.update` notifications, in seconds.
///
/// Only the values in [`BatchDelay::ALLOWED`] are representable; zero means
/// notify immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BatchDelay(u32);

impl BatchDelay {
    pub const ALLOWED: [u32; 5] = [0, 60, 120, 300, 600];
    pub const MAX_SECS: u32 = 600;

    pub fn new(secs: u32) -> Result<Self, DbError> {
        if Self::ALLOWED.contains(&secs) {
            Ok(Self(secs))
        } else {
            Err(DbError::InvalidData(format!(
                "batch_delay must be one of {:?}, got {secs}",
                Self::ALLOWED
            )))
        }
    }

    pub fn secs(self) -> u32 {
        self.0
    }

    pub fn is_immediate(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u32> for BatchDelay {
    type Error = DbError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BatchDelay> for u32 {
    fn from(value: BatchDelay) -> Self {
        value.0
    }
}

macro_rules! text_column {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: DbError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_column!(SubscriptionType);
text_column!(SubscriptionStatus);

impl ToSql for BatchDelay {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for BatchDelay {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let secs = u32::try_from(value.as_i64()?).map_err(|_| FromSqlError::OutOfRange(0))?;
        BatchDelay::new(secs).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
