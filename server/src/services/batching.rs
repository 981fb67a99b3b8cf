//! Debounced `channel.update` notifications.
//!
//! With a batch delay the updates of a favourite accumulate in the cache
//! under `channel_update_batch:<favourite_id>` and one delayed job per
//! favourite flushes them as a single push message.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use twitch_client::eventsub::ChannelUpdateEvent;

use notifier_db::{BatchDelay, Database, DbError, FavouriteStreamer};

use super::cache::CacheStore;
use super::jobs::JobQueue;
use crate::notification::{NotificationSink, NotifyError, PushMessage};

/// Longest batch delay plus slack, so an entry outlives its flush job.
pub const BATCH_CACHE_TTL: Duration = Duration::from_secs(BatchDelay::MAX_SECS as u64 + 300);

pub fn batch_key(favourite_id: i64) -> String {
    format!("channel_update_batch:{favourite_id}")
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Invalid batched update: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct BatchingEngine {
    db: Database,
    cache: CacheStore,
    jobs: JobQueue,
    sink: Arc<dyn NotificationSink>,
    timezone: Tz,
}

impl BatchingEngine {
    pub fn new(
        db: Database,
        cache: CacheStore,
        jobs: JobQueue,
        sink: Arc<dyn NotificationSink>,
        timezone: Tz,
    ) -> Self {
        Self {
            db,
            cache,
            jobs,
            sink,
            timezone,
        }
    }

    /// Notify now, or queue the update behind the favourite's batch delay.
    pub async fn handle_update(
        &self,
        favourite: &FavouriteStreamer,
        update: ChannelUpdateEvent,
        batch_delay: Option<BatchDelay>,
    ) -> Result<(), BatchError> {
        let delay = match batch_delay {
            Some(d) if !d.is_immediate() => d,
            _ => {
                let now = Utc::now().with_timezone(&self.timezone);
                let message = PushMessage::channel_updated(&update, &now);
                self.sink.send(favourite.user_id, message).await?;
                return Ok(());
            }
        };

        let key = batch_key(favourite.id);
        let pending = self
            .cache
            .append(&key, serde_json::to_value(&update)?, BATCH_CACHE_TTL);

        let engine = self.clone();
        let favourite_id = favourite.id;
        let scheduled = self.jobs.schedule_unique(
            key,
            Duration::from_secs(u64::from(delay.secs())),
            move || async move {
                if let Err(e) = engine.flush(favourite_id).await {
                    tracing::error!(favourite_streamer_id = favourite_id, "Batch flush failed: {e}");
                }
            },
        );

        tracing::debug!(
            favourite_streamer_id = favourite.id,
            pending,
            scheduled,
            "Channel update batched"
        );
        Ok(())
    }

    /// Pop the pending batch and send it. Returns whether a message was sent.
    ///
    /// A missing or empty batch is a no-op, as is a batch whose favourite
    /// has been deleted in the meantime.
    pub async fn flush(&self, favourite_id: i64) -> Result<bool, BatchError> {
        let Some(value) = self.cache.pull(&batch_key(favourite_id)) else {
            return Ok(false);
        };
        let updates: Vec<ChannelUpdateEvent> = serde_json::from_value(value)?;
        if updates.is_empty() {
            return Ok(false);
        }

        let Some(favourite) = self.db.get_favourite(favourite_id)? else {
            tracing::debug!(
                favourite_streamer_id = favourite_id,
                dropped = updates.len(),
                "Favourite gone; dropping batched updates"
            );
            return Ok(false);
        };

        let Some(message) = PushMessage::channel_updates_batched(&updates) else {
            return Ok(false);
        };
        self.sink.send(favourite.user_id, message).await?;
        tracing::info!(
            favourite_streamer_id = favourite_id,
            updates = updates.len(),
            "Batched channel updates sent"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::{RecordingSink, seed_favourite};

    fn update(title: &str, category: &str) -> ChannelUpdateEvent {
        ChannelUpdateEvent {
            broadcaster_user_id: "123456".into(),
            broadcaster_user_login: "teststreamer".into(),
            broadcaster_user_name: "TestStreamer".into(),
            title: title.into(),
            language: "en".into(),
            category_id: "509658".into(),
            category_name: category.into(),
            content_classification_labels: Vec::new(),
        }
    }

    struct Fixture {
        db: Database,
        cache: CacheStore,
        jobs: JobQueue,
        sink: Arc<RecordingSink>,
        engine: BatchingEngine,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let cache = CacheStore::new();
        let jobs = JobQueue::new(tokio_util::sync::CancellationToken::new());
        let sink = Arc::new(RecordingSink::default());
        let engine = BatchingEngine::new(
            db.clone(),
            cache.clone(),
            jobs.clone(),
            sink.clone(),
            chrono_tz::Europe::Brussels,
        );
        Fixture {
            db,
            cache,
            jobs,
            sink,
            engine,
        }
    }

    fn delay(secs: u32) -> Option<BatchDelay> {
        Some(BatchDelay::new(secs).unwrap())
    }

    #[tokio::test]
    async fn immediate_delay_sends_one_message_per_update() {
        let f = fixture();
        let fav = seed_favourite(&f.db, "123456", "TestStreamer");

        for d in [None, delay(0)] {
            f.engine
                .handle_update(&fav, update("Speedruns", "Just Chatting"), d)
                .await
                .unwrap();
        }

        let sent = f.sink.messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, fav.user_id);
        assert_eq!(sent[0].1.title, "teststreamer updated their channel");
        assert!(sent[0].1.body.starts_with("Title changed to \"Speedruns\" (Just Chatting) ("));
        assert!(f.cache.is_empty());
        assert_eq!(f.jobs.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn updates_within_window_are_sent_once_after_flush() {
        let f = fixture();
        let fav = seed_favourite(&f.db, "123456", "TestStreamer");

        f.engine
            .handle_update(&fav, update("One", "Chess"), delay(120))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        f.engine
            .handle_update(&fav, update("Two", "Chess"), delay(120))
            .await
            .unwrap();

        let pending = f.cache.get(&batch_key(fav.id)).unwrap();
        assert_eq!(pending.as_array().map(Vec::len), Some(2));
        assert_eq!(f.jobs.pending_count(), 1);
        assert!(f.sink.messages().is_empty());

        tokio::time::sleep(Duration::from_secs(111)).await;
        tokio::task::yield_now().await;

        let sent = f.sink.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].1.body,
            "2 changes\n- \"One\" (Chess)\n- \"Two\" (Chess)"
        );
        assert!(f.cache.get(&batch_key(fav.id)).is_none());
        assert_eq!(f.jobs.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn window_is_measured_from_the_first_update() {
        let f = fixture();
        let fav = seed_favourite(&f.db, "123456", "TestStreamer");

        f.engine
            .handle_update(&fav, update("One", "Chess"), delay(60))
            .await
            .unwrap();
        // Later updates neither extend nor restart the window.
        for secs in [20, 20, 19] {
            tokio::time::advance(Duration::from_secs(secs)).await;
            f.engine
                .handle_update(&fav, update("More", "Chess"), delay(60))
                .await
                .unwrap();
        }
        assert!(f.sink.messages().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        let sent = f.sink.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.body.starts_with("4 changes"));
    }

    #[tokio::test]
    async fn flushing_an_empty_batch_is_a_noop() {
        let f = fixture();
        let fav = seed_favourite(&f.db, "123456", "TestStreamer");

        assert!(!f.engine.flush(fav.id).await.unwrap());
        f.cache.put(&batch_key(fav.id), json!([]), BATCH_CACHE_TTL);
        assert!(!f.engine.flush(fav.id).await.unwrap());
        assert!(f.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn flush_drops_batch_of_deleted_favourite() {
        let f = fixture();
        let fav = seed_favourite(&f.db, "123456", "TestStreamer");
        f.cache.append(
            &batch_key(fav.id),
            serde_json::to_value(update("One", "Chess")).unwrap(),
            BATCH_CACHE_TTL,
        );
        f.db.delete_favourite(fav.id).unwrap();

        assert!(!f.engine.flush(fav.id).await.unwrap());
        assert!(f.sink.messages().is_empty());
        assert!(f.cache.get(&batch_key(fav.id)).is_none());
    }

    #[tokio::test]
    async fn second_flush_finds_nothing() {
        let f = fixture();
        let fav = seed_favourite(&f.db, "123456", "TestStreamer");
        f.cache.append(
            &batch_key(fav.id),
            serde_json::to_value(update("One", "Chess")).unwrap(),
            BATCH_CACHE_TTL,
        );

        assert!(f.engine.flush(fav.id).await.unwrap());
        assert!(!f.engine.flush(fav.id).await.unwrap());
        assert_eq!(f.sink.messages().len(), 1);
    }
}
