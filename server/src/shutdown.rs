use std::time::Duration;

use tokio::time::sleep;

use crate::app::SharedState;

const JOB_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Cancel the shutdown token, which stops the HTTP server and runs waiting
/// batch jobs right away, then wait for those jobs to finish.
pub async fn graceful_shutdown(state: &SharedState) {
    tracing::info!("Shutdown sequence started");

    state.shutdown_token().cancel();
    tracing::info!(
        in_flight_jobs = state.jobs().in_flight(),
        "Shutdown: server stopping, pending batch jobs released"
    );

    if tokio::time::timeout(JOB_DRAIN_TIMEOUT, state.jobs().wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            in_flight_jobs = state.jobs().in_flight(),
            "Shutdown: batch jobs still running after timeout"
        );
    }

    sleep(Duration::from_millis(200)).await;
    tracing::info!("Shutdown sequence completed");
}

#[cfg(test)]
mod tests {
    use notifier_db::{BatchDelay, SubscriptionStatus, SubscriptionType};
    use twitch_client::eventsub::ChannelUpdateEvent;

    use super::*;
    use crate::test_support::{seed_favourite, test_app};

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_waiting_batches_before_returning() {
        let app = test_app();
        let fav = seed_favourite(app.state.db(), "123456", "TestStreamer");
        app.state
            .db()
            .upsert_subscription(fav.id, SubscriptionType::ChannelUpdate, SubscriptionStatus::Enabled)
            .unwrap();
        let update = ChannelUpdateEvent {
            broadcaster_user_id: "123456".into(),
            broadcaster_user_login: "teststreamer".into(),
            broadcaster_user_name: "TestStreamer".into(),
            title: "Late night".into(),
            language: "en".into(),
            category_id: "509658".into(),
            category_name: "Just Chatting".into(),
            content_classification_labels: Vec::new(),
        };
        app.state
            .dispatcher()
            .batching()
            .handle_update(&fav, update, Some(BatchDelay::new(600).unwrap()))
            .await
            .unwrap();
        assert!(app.sink.messages().is_empty());

        graceful_shutdown(&app.state).await;

        assert_eq!(app.sink.messages().len(), 1);
        assert_eq!(app.state.jobs().in_flight(), 0);
    }
}
