//! Keeps Twitch EventSub subscriptions in line with favourite streamers.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use twitch_client::TwitchError;
use twitch_client::api::EventSubSubscription;

use notifier_db::{
    BatchDelay, Database, DbError, FavouriteStreamer, Subscription, SubscriptionStatus,
    SubscriptionType,
};

use super::helix::HelixApi;
use super::token_manager::{TokenError, TokenManager};

/// Hooks run by whoever creates or deletes a favourite streamer.
#[async_trait]
pub trait FavouriteStreamerLifecycle: Send + Sync {
    async fn on_created(&self, favourite: &FavouriteStreamer);
    async fn on_deleted(&self, favourite: &FavouriteStreamer);
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Twitch API error: {0}")]
    Twitch(#[from] TwitchError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

fn upstream_status(sub: &EventSubSubscription) -> SubscriptionStatus {
    SubscriptionStatus::from_str(&sub.status).unwrap_or_else(|_| {
        tracing::warn!(subscription_id = %sub.id, status = %sub.status, "Unknown subscription status");
        SubscriptionStatus::Pending
    })
}

pub struct SubscriptionReconciler {
    db: Database,
    tokens: Arc<TokenManager>,
    helix: Arc<dyn HelixApi>,
}

impl SubscriptionReconciler {
    pub fn new(db: Database, tokens: Arc<TokenManager>, helix: Arc<dyn HelixApi>) -> Self {
        Self { db, tokens, helix }
    }

    /// Delete every upstream subscription of a broadcaster. Returns how many.
    pub async fn delete_all_upstream(
        &self,
        app_token: &str,
        broadcaster_id: &str,
    ) -> Result<usize, ReconcileError> {
        let existing = self
            .helix
            .fetch_subscriptions(app_token, Some(broadcaster_id))
            .await?;
        for sub in &existing {
            self.helix.delete_subscription(app_token, &sub.id).await?;
            tracing::debug!(subscription_id = %sub.id, broadcaster_id, "Deleted EventSub subscription");
        }
        Ok(existing.len())
    }

    /// Replace whatever Twitch holds for the broadcaster with a fresh
    /// `stream.online` subscription.
    pub async fn setup_stream_online(
        &self,
        favourite: &FavouriteStreamer,
    ) -> Result<Subscription, ReconcileError> {
        let app_token = self.tokens.ensure_fresh_app_token().await?;
        self.delete_all_upstream(&app_token, &favourite.streamer_id).await?;

        let created = self
            .helix
            .create_subscription(&app_token, &favourite.streamer_id, SubscriptionType::StreamOnline)
            .await?;
        let status = upstream_status(&created);

        self.db.set_favourite_status(favourite.id, status)?;
        let sub = self
            .db
            .upsert_subscription(favourite.id, SubscriptionType::StreamOnline, status)?;
        tracing::info!(
            favourite_streamer_id = favourite.id,
            subscription_id = %created.id,
            %status,
            "stream.online subscription created"
        );
        Ok(sub)
    }

    /// Bring upstream subscriptions and local rows to `desired`.
    ///
    /// Types no longer wanted are deleted upstream and locally; new types get
    /// a `pending` row before the upstream create. Types already subscribed
    /// are left untouched. `batch_delay` of `None` keeps the stored delay;
    /// `Some(None)` clears it.
    pub async fn reconcile_settings(
        &self,
        favourite: &FavouriteStreamer,
        desired: &[SubscriptionType],
        batch_delay: Option<Option<BatchDelay>>,
    ) -> Result<Vec<Subscription>, ReconcileError> {
        let app_token = self.tokens.ensure_fresh_app_token().await?;
        let desired: HashSet<SubscriptionType> = desired.iter().copied().collect();

        let upstream = self
            .helix
            .fetch_subscriptions(&app_token, Some(&favourite.streamer_id))
            .await?;

        let mut subscribed = HashSet::new();
        for sub in &upstream {
            let Ok(sub_type) = SubscriptionType::from_str(&sub.subscription_type) else {
                continue;
            };
            if desired.contains(&sub_type) {
                subscribed.insert(sub_type);
                if self.db.get_subscription(favourite.id, sub_type)?.is_none() {
                    self.db
                        .upsert_subscription(favourite.id, sub_type, upstream_status(sub))?;
                }
                continue;
            }
            self.helix.delete_subscription(&app_token, &sub.id).await?;
            self.db.delete_subscription(favourite.id, sub_type)?;
            tracing::info!(favourite_streamer_id = favourite.id, %sub_type, "Subscription removed");
        }

        for sub_type in SubscriptionType::ALL {
            if !desired.contains(&sub_type) {
                self.db.delete_subscription(favourite.id, sub_type)?;
                continue;
            }
            if subscribed.contains(&sub_type) {
                continue;
            }
            self.db
                .upsert_subscription(favourite.id, sub_type, SubscriptionStatus::Pending)?;
            let created = self
                .helix
                .create_subscription(&app_token, &favourite.streamer_id, sub_type)
                .await?;
            self.db
                .set_subscription_status(favourite.id, sub_type, upstream_status(&created))?;
            tracing::info!(favourite_streamer_id = favourite.id, %sub_type, "Subscription added");
        }

        if let Some(delay) = batch_delay {
            self.db.set_batch_delay(favourite.id, delay)?;
        }

        Ok(self.db.list_subscriptions(favourite.id)?)
    }
}

#[async_trait]
impl FavouriteStreamerLifecycle for SubscriptionReconciler {
    async fn on_created(&self, favourite: &FavouriteStreamer) {
        if let Err(e) = self.setup_stream_online(favourite).await {
            tracing::error!(
                favourite_streamer_id = favourite.id,
                "Failed to set up EventSub subscription: {e}"
            );
        }
    }

    async fn on_deleted(&self, favourite: &FavouriteStreamer) {
        let result: Result<usize, ReconcileError> = async {
            let app_token = self.tokens.ensure_fresh_app_token().await?;
            self.delete_all_upstream(&app_token, &favourite.streamer_id).await
        }
        .await;
        if let Err(e) = result {
            tracing::error!(
                favourite_streamer_id = favourite.id,
                "Failed to delete EventSub subscriptions: {e}"
            );
        }
    }
}
