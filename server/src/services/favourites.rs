//! Favourite streamer CRUD with lifecycle hooks.

use std::sync::Arc;

use notifier_db::{Database, DbError, FavouriteStreamer, TwitchEvent};

use super::reconciler::FavouriteStreamerLifecycle;

pub const RECENT_EVENTS_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum FavouriteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Favourite streamer belongs to another user")]
    Forbidden,

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

pub struct FavouritesService {
    db: Database,
    lifecycle: Arc<dyn FavouriteStreamerLifecycle>,
}

impl FavouritesService {
    pub fn new(db: Database, lifecycle: Arc<dyn FavouriteStreamerLifecycle>) -> Self {
        Self { db, lifecycle }
    }

    /// Add the streamer to the user's favourites, or remove it when already
    /// there. Returns whether it is a favourite afterwards.
    pub async fn toggle_favourite(
        &self,
        user_id: i64,
        streamer_id: &str,
        streamer_name: &str,
    ) -> Result<bool, FavouriteError> {
        if self.db.get_user(user_id)?.is_none() {
            return Err(FavouriteError::NotFound(format!("user {user_id}")));
        }

        if let Some(existing) = self.db.find_favourite(user_id, streamer_id)? {
            self.db.delete_favourite(existing.id)?;
            tracing::info!(user_id, favourite_streamer_id = existing.id, "Favourite removed");
            self.lifecycle.on_deleted(&existing).await;
            return Ok(false);
        }

        let created = self.db.create_favourite(user_id, streamer_id, streamer_name)?;
        tracing::info!(user_id, favourite_streamer_id = created.id, streamer_id, "Favourite added");
        self.lifecycle.on_created(&created).await;
        Ok(true)
    }

    pub fn get(&self, favourite_id: i64) -> Result<FavouriteStreamer, FavouriteError> {
        self.db
            .get_favourite(favourite_id)?
            .ok_or_else(|| FavouriteError::NotFound(format!("favourite streamer {favourite_id}")))
    }

    /// The favourite, provided it belongs to `user_id`.
    pub fn owned_by(&self, favourite_id: i64, user_id: i64) -> Result<FavouriteStreamer, FavouriteError> {
        let favourite = self.get(favourite_id)?;
        if favourite.user_id != user_id {
            return Err(FavouriteError::Forbidden);
        }
        Ok(favourite)
    }

    /// Latest events of the favourite's streamer, newest first.
    pub fn streamer_events(
        &self,
        favourite_id: i64,
        user_id: i64,
    ) -> Result<Vec<TwitchEvent>, FavouriteError> {
        let favourite = self.owned_by(favourite_id, user_id)?;
        Ok(self
            .db
            .recent_events_for_streamer(&favourite.streamer_id, RECENT_EVENTS_LIMIT)?)
    }

    pub fn favourite_streamer_ids(&self, user_id: i64) -> Result<Vec<String>, FavouriteError> {
        Ok(self
            .db
            .list_favourites_for_user(user_id)?
            .into_iter()
            .map(|f| f.streamer_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use notifier_db::NewTwitchEvent;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingLifecycle {
        calls: Mutex<Vec<(&'static str, String)>>,
    }

    #[async_trait]
    impl FavouriteStreamerLifecycle for RecordingLifecycle {
        async fn on_created(&self, favourite: &FavouriteStreamer) {
            self.calls.lock().unwrap().push(("created", favourite.streamer_id.clone()));
        }

        async fn on_deleted(&self, favourite: &FavouriteStreamer) {
            self.calls.lock().unwrap().push(("deleted", favourite.streamer_id.clone()));
        }
    }

    fn service() -> (Database, Arc<RecordingLifecycle>, FavouritesService) {
        let db = Database::open_in_memory().unwrap();
        let lifecycle = Arc::new(RecordingLifecycle::default());
        let service = FavouritesService::new(db.clone(), lifecycle.clone());
        (db, lifecycle, service)
    }

    #[tokio::test]
    async fn toggle_adds_then_removes_and_runs_hooks() {
        let (db, lifecycle, service) = service();
        let user = db.upsert_user("9001", "viewer").unwrap();

        assert!(service.toggle_favourite(user.id, "123456", "TestStreamer").await.unwrap());
        assert!(db.find_favourite(user.id, "123456").unwrap().is_some());

        assert!(!service.toggle_favourite(user.id, "123456", "TestStreamer").await.unwrap());
        assert!(db.find_favourite(user.id, "123456").unwrap().is_none());

        let calls = lifecycle.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("created", "123456".to_string()), ("deleted", "123456".to_string())]
        );
    }

    #[tokio::test]
    async fn toggle_for_unknown_user_is_not_found() {
        let (_db, lifecycle, service) = service();
        let err = service.toggle_favourite(77, "123456", "TestStreamer").await.unwrap_err();
        assert!(matches!(err, FavouriteError::NotFound(_)));
        assert!(lifecycle.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn events_of_another_users_favourite_are_forbidden() {
        let (db, _lifecycle, service) = service();
        let owner = db.upsert_user("1", "owner").unwrap();
        let other = db.upsert_user("2", "other").unwrap();
        let fav = db.create_favourite(owner.id, "123456", "TestStreamer").unwrap();

        assert!(matches!(
            service.streamer_events(fav.id, other.id),
            Err(FavouriteError::Forbidden)
        ));
        assert!(matches!(
            service.streamer_events(fav.id + 1, owner.id),
            Err(FavouriteError::NotFound(_))
        ));
    }

    #[test]
    fn events_are_capped_and_newest_first() {
        let (db, _lifecycle, service) = service();
        let owner = db.upsert_user("1", "owner").unwrap();
        let fav = db.create_favourite(owner.id, "123456", "TestStreamer").unwrap();
        for i in 0..(RECENT_EVENTS_LIMIT as i64 + 5) {
            db.record_twitch_event(&NewTwitchEvent {
                event_id: None,
                event_type: "channel.update".into(),
                streamer_id: "123456".into(),
                streamer_name: "TestStreamer".into(),
                payload: json!({ "n": i }),
                occurred_at: 1_700_000_000 + i,
            })
            .unwrap();
        }

        let events = service.streamer_events(fav.id, owner.id).unwrap();
        assert_eq!(events.len(), RECENT_EVENTS_LIMIT);
        assert_eq!(events[0].payload["n"], RECENT_EVENTS_LIMIT as i64 + 4);
    }
}
