//! Operator-triggered test push.

use anyhow::Context;
use notifier_db::{Database, User};

use super::{NotificationSink, PushMessage};

pub const TEST_BROADCASTER: &str = "testBroadcaster";

/// Send a "stream started" message for `broadcaster` to `user_id` right away.
pub async fn send_test_notification(
    db: &Database,
    sink: &dyn NotificationSink,
    user_id: i64,
    broadcaster: &str,
) -> anyhow::Result<User> {
    let user = db
        .get_user(user_id)?
        .with_context(|| format!("User {user_id} not found"))?;
    sink.send(user.id, PushMessage::stream_started(broadcaster))
        .await
        .context("Test notification failed")?;
    tracing::info!(user_id = user.id, user = %user.name, "Test notification sent");
    Ok(user)
}
