//! Background task loops.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::app::SharedState;

pub const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(300);

async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Periodically drop expired cache entries (replay guards, stale batches,
/// Helix responses) that were never read again.
pub async fn cache_purge_loop(state: SharedState) {
    let shutdown_token = state.shutdown_token().clone();

    loop {
        if sleep_or_cancel(&shutdown_token, CACHE_PURGE_INTERVAL).await {
            tracing::info!("Cache purge loop stopped (shutdown)");
            return;
        }

        let purged = state.cache().purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = state.cache().len(), "Expired cache entries purged");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::test_app;

    #[tokio::test(start_paused = true)]
    async fn purge_loop_evicts_and_stops_on_shutdown() {
        let app = test_app();
        app.state
            .cache()
            .put("short", json!(1), Duration::from_secs(10));
        app.state
            .cache()
            .put("long", json!(2), Duration::from_secs(3600));

        let handle = tokio::spawn(cache_purge_loop(app.state.clone()));
        tokio::time::sleep(CACHE_PURGE_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(app.state.cache().len(), 1);

        app.state.shutdown_token().cancel();
        handle.await.unwrap();
    }
}
