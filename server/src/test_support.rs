//! Fakes for the Twitch and push collaborators, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use twitch_client::api::{
    BroadcastSchedule, EventSubCondition, EventSubSubscription, EventSubTransport, FollowedChannel,
    StreamInfo,
};
use twitch_client::{AppToken, Token, TwitchError};

use notifier_db::{Database, FavouriteStreamer, SubscriptionType, TokenCipher, User, UserCredentials};

use crate::app::{Collaborators, SharedState};
use crate::config::AppConfig;
use crate::notification::{NotificationSink, NotifyError, PushMessage};
use crate::services::helix::HelixApi;
use crate::services::token_manager::TokenEndpoint;

pub const TEST_SECRET: &str = "s3cRe7-webhook-secret";
pub const TEST_USER_TWITCH_ID: &str = "9001";

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(i64, PushMessage)>>,
    unreachable: Mutex<HashSet<i64>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<(i64, PushMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<i64> {
        self.messages().into_iter().map(|(user_id, _)| user_id).collect()
    }

    /// Make every send to `user_id` fail.
    pub fn fail_for(&self, user_id: i64) {
        self.unreachable.lock().unwrap().insert(user_id);
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, user_id: i64, message: PushMessage) -> Result<(), NotifyError> {
        if self.unreachable.lock().unwrap().contains(&user_id) {
            return Err(NotifyError::Delivery(format!("push endpoint gone for user {user_id}")));
        }
        self.sent.lock().unwrap().push((user_id, message));
        Ok(())
    }
}

pub struct FakeTokenEndpoint {
    pub refresh_calls: AtomicUsize,
    pub app_calls: AtomicUsize,
    pub app_expires_in: AtomicI64,
    pub fail_refresh: AtomicBool,
    pub fail_app: AtomicBool,
}

impl Default for FakeTokenEndpoint {
    fn default() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            app_calls: AtomicUsize::new(0),
            app_expires_in: AtomicI64::new(5_184_000),
            fail_refresh: AtomicBool::new(false),
            fail_app: AtomicBool::new(false),
        }
    }
}

impl FakeTokenEndpoint {
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn app_calls(&self) -> usize {
        self.app_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenEndpoint for FakeTokenEndpoint {
    async fn refresh_user_token(&self, refresh_token: &str) -> Result<Token, TwitchError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        // Let concurrent callers reach the lock while this refresh is in flight.
        tokio::task::yield_now().await;
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(TwitchError::Unauthorized(format!("Invalid refresh token {refresh_token}")));
        }
        Ok(Token {
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
            scope: "user:read:follows".into(),
            expires_at: Utc::now().timestamp() + 14_400,
        })
    }

    async fn app_token(&self) -> Result<AppToken, TwitchError> {
        let n = self.app_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        if self.fail_app.load(Ordering::SeqCst) {
            return Err(TwitchError::ApiError {
                status: 400,
                message: "invalid client secret".into(),
            });
        }
        Ok(AppToken {
            access_token: format!("app-token-{n}"),
            expires_in: self.app_expires_in.load(Ordering::SeqCst),
        })
    }
}

#[derive(Default)]
pub struct FakeHelix {
    pub subscriptions: Mutex<Vec<EventSubSubscription>>,
    pub followed: Mutex<Vec<FollowedChannel>>,
    pub streams: Mutex<Vec<StreamInfo>>,
    pub schedules: Mutex<HashMap<String, BroadcastSchedule>>,
    pub fail_create: AtomicBool,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl FakeHelix {
    pub fn subscription(id: &str, broadcaster_id: &str, subscription_type: &str, status: &str) -> EventSubSubscription {
        EventSubSubscription {
            id: id.into(),
            status: status.into(),
            subscription_type: subscription_type.into(),
            version: "1".into(),
            condition: EventSubCondition {
                broadcaster_user_id: Some(broadcaster_id.into()),
            },
            created_at: "2025-11-16T12:00:00Z".into(),
            transport: EventSubTransport {
                method: "webhook".into(),
                callback: Some("https://notifier.example.com/twitch/eventsub".into()),
            },
            cost: 1,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upstream_types(&self, broadcaster_id: &str) -> Vec<String> {
        let mut types: Vec<String> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.condition.broadcaster_user_id.as_deref() == Some(broadcaster_id))
            .map(|s| s.subscription_type.clone())
            .collect();
        types.sort();
        types
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HelixApi for FakeHelix {
    async fn fetch_subscriptions(
        &self,
        _app_token: &str,
        broadcaster_id: Option<&str>,
    ) -> Result<Vec<EventSubSubscription>, TwitchError> {
        self.record(format!("fetch:{}", broadcaster_id.unwrap_or("*")));
        let subs = self.subscriptions.lock().unwrap();
        Ok(subs
            .iter()
            .filter(|s| {
                broadcaster_id.is_none_or(|id| s.condition.broadcaster_user_id.as_deref() == Some(id))
            })
            .cloned()
            .collect())
    }

    async fn create_subscription(
        &self,
        _app_token: &str,
        broadcaster_id: &str,
        subscription_type: SubscriptionType,
    ) -> Result<EventSubSubscription, TwitchError> {
        self.record(format!("create:{broadcaster_id}:{subscription_type}"));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(TwitchError::ApiError {
                status: 409,
                message: "subscription already exists".into(),
            });
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let sub = Self::subscription(
            &format!("sub-{n}"),
            broadcaster_id,
            subscription_type.as_str(),
            "webhook_callback_verification_pending",
        );
        self.subscriptions.lock().unwrap().push(sub.clone());
        Ok(sub)
    }

    async fn delete_subscription(&self, _app_token: &str, subscription_id: &str) -> Result<(), TwitchError> {
        self.record(format!("delete:{subscription_id}"));
        self.subscriptions
            .lock()
            .unwrap()
            .retain(|s| s.id != subscription_id);
        Ok(())
    }

    async fn get_followed_streamers(
        &self,
        _user_token: &str,
        user_id: &str,
    ) -> Result<Vec<FollowedChannel>, TwitchError> {
        self.record(format!("followed:{user_id}"));
        Ok(self.followed.lock().unwrap().clone())
    }

    async fn get_status_of_followed_streamers(
        &self,
        _user_token: &str,
        user_id: &str,
    ) -> Result<Vec<StreamInfo>, TwitchError> {
        self.record(format!("streams:{user_id}"));
        Ok(self.streams.lock().unwrap().clone())
    }

    async fn get_broadcast_schedule(
        &self,
        _app_token: &str,
        broadcaster_id: &str,
    ) -> Result<Option<BroadcastSchedule>, TwitchError> {
        self.record(format!("schedule:{broadcaster_id}"));
        Ok(self.schedules.lock().unwrap().get(broadcaster_id).cloned())
    }
}

pub struct TestApp {
    pub state: SharedState,
    pub helix: Arc<FakeHelix>,
    pub tokens: Arc<FakeTokenEndpoint>,
    pub sink: Arc<RecordingSink>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        client_id: "abcdefghijklmnopqrstuvwxyz0123".into(),
        client_secret: "client-secret".into(),
        eventsub_secret: TEST_SECRET.into(),
        eventsub_callback_url: "https://notifier.example.com/twitch/eventsub".into(),
        token_encryption_key: TokenCipher::generate_key(),
        ..AppConfig::default()
    }
}

pub fn test_app() -> TestApp {
    let db = Database::open_in_memory().unwrap();
    let helix = Arc::new(FakeHelix::default());
    let tokens = Arc::new(FakeTokenEndpoint::default());
    let sink = Arc::new(RecordingSink::default());
    let state = SharedState::new(
        db,
        test_config(),
        Collaborators {
            token_endpoint: tokens.clone(),
            helix: helix.clone(),
            sink: sink.clone(),
        },
    )
    .unwrap();
    TestApp {
        state,
        helix,
        tokens,
        sink,
    }
}

/// A favourite of the shared test user.
pub fn seed_favourite(db: &Database, streamer_id: &str, streamer_name: &str) -> FavouriteStreamer {
    let user = db.upsert_user(TEST_USER_TWITCH_ID, "viewer").unwrap();
    db.create_favourite(user.id, streamer_id, streamer_name).unwrap()
}

/// The shared test user with stored credentials expiring at `expires_at`.
pub fn seed_user_with_tokens(state: &SharedState, expires_at: i64) -> User {
    let user = state.db().upsert_user(TEST_USER_TWITCH_ID, "viewer").unwrap();
    let credentials = UserCredentials {
        access_token: "stored-access".into(),
        refresh_token: "stored-refresh".into(),
        expires_at,
    };
    state
        .db()
        .save_user_credentials(user.id, &credentials, state.tokens().cipher())
        .unwrap();
    user
}
