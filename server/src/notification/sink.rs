//! Push delivery seam.

use async_trait::async_trait;
use notifier_db::{Database, DbError, PushSubscription};

use super::types::PushMessage;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Push delivery failed: {0}")]
    Delivery(String),

    #[error("Push device lookup failed: {0}")]
    Devices(#[from] DbError),
}

/// Delivers a push message to every device of a user.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, user_id: i64, message: PushMessage) -> Result<(), NotifyError>;
}

/// Sink that resolves the user's registered devices and logs one delivery
/// per device. Used when no Web Push transport is wired in.
#[derive(Clone)]
pub struct TracingNotificationSink {
    db: Database,
}

impl TracingNotificationSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Devices a message for `user_id` goes to.
    pub fn targets(&self, user_id: i64) -> Result<Vec<PushSubscription>, NotifyError> {
        Ok(self.db.push_subscriptions_for_user(user_id)?)
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn send(&self, user_id: i64, message: PushMessage) -> Result<(), NotifyError> {
        let devices = self.targets(user_id)?;
        if devices.is_empty() {
            tracing::debug!(user_id, title = %message.title, "No push device registered; message dropped");
            return Ok(());
        }
        for device in devices {
            tracing::info!(
                user_id,
                endpoint = %device.endpoint,
                title = %message.title,
                url = %message.url,
                "Push notification: {}",
                message.body
            );
        }
        Ok(())
    }
}
