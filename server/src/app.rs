use std::sync::Arc;

use chrono_tz::Tz;
use notifier_db::{Database, TokenCipher};
use tokio_util::sync::CancellationToken;
use twitch_client::api::TwitchApiClient;
use twitch_client::auth::TwitchAuth;

use crate::config::{AppConfig, ConfigError};
use crate::notification::{NotificationSink, TracingNotificationSink};
use crate::services::batching::BatchingEngine;
use crate::services::cache::CacheStore;
use crate::services::dispatcher::WebhookDispatcher;
use crate::services::favourites::FavouritesService;
use crate::services::helix::{CachedHelix, HelixApi, TwitchHelix};
use crate::services::jobs::JobQueue;
use crate::services::reconciler::SubscriptionReconciler;
use crate::services::token_manager::{TokenEndpoint, TokenManager};
use crate::services::verifier::SignatureVerifier;

/// External systems the notifier talks to.
pub struct Collaborators {
    pub token_endpoint: Arc<dyn TokenEndpoint>,
    pub helix: Arc<dyn HelixApi>,
    pub sink: Arc<dyn NotificationSink>,
}

impl Collaborators {
    /// Real Twitch endpoints; push messages are logged per registered device.
    pub fn twitch(config: &AppConfig, db: &Database) -> Self {
        let auth = TwitchAuth::with_base_url(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.auth_base_url.clone(),
        );
        let api = TwitchApiClient::with_base_url(config.client_id.clone(), config.api_base_url.clone());
        let helix = TwitchHelix::new(
            api,
            config.eventsub_callback_url.clone(),
            config.eventsub_secret.clone(),
        );
        Self {
            token_endpoint: Arc::new(auth),
            helix: Arc::new(helix),
            sink: Arc::new(TracingNotificationSink::new(db.clone())),
        }
    }
}

/// Application shared state accessible from axum handlers and background jobs.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    config: AppConfig,
    db: Database,
    cache: CacheStore,
    jobs: JobQueue,
    tokens: Arc<TokenManager>,
    helix: CachedHelix,
    reconciler: Arc<SubscriptionReconciler>,
    verifier: SignatureVerifier,
    dispatcher: WebhookDispatcher,
    favourites: FavouritesService,
    /// Cancelled on shutdown; also releases waiting batch jobs early.
    shutdown_token: CancellationToken,
}

impl SharedState {
    /// Wire every service from an already-opened database and loaded config.
    pub fn new(db: Database, config: AppConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        let cipher = TokenCipher::from_key(&config.token_encryption_key).map_err(|e| ConfigError::Invalid {
            key: "TOKEN_ENCRYPTION_KEY".into(),
            message: e.to_string(),
        })?;
        let timezone: Tz = config
            .notification_timezone
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key: "NOTIFICATION_TIMEZONE".into(),
                message: format!("unknown timezone '{}'", config.notification_timezone),
            })?;

        let shutdown_token = CancellationToken::new();
        let cache = CacheStore::new();
        let jobs = JobQueue::new(shutdown_token.clone());

        let tokens = Arc::new(TokenManager::new(
            db.clone(),
            cipher,
            cache.clone(),
            collaborators.token_endpoint,
        ));
        let helix = CachedHelix::new(collaborators.helix.clone(), cache.clone());
        let reconciler = Arc::new(SubscriptionReconciler::new(
            db.clone(),
            tokens.clone(),
            collaborators.helix,
        ));
        let batching = BatchingEngine::new(
            db.clone(),
            cache.clone(),
            jobs.clone(),
            collaborators.sink.clone(),
            timezone,
        );
        let dispatcher = WebhookDispatcher::new(db.clone(), batching, collaborators.sink);
        let verifier = SignatureVerifier::new(cache.clone(), config.eventsub_secret.clone());
        let favourites = FavouritesService::new(db.clone(), reconciler.clone());

        Ok(Self {
            inner: Arc::new(SharedStateInner {
                config,
                db,
                cache,
                jobs,
                tokens,
                helix,
                reconciler,
                verifier,
                dispatcher,
                favourites,
                shutdown_token,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn server_port(&self) -> u16 {
        self.inner.config.server_port
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    pub fn jobs(&self) -> &JobQueue {
        &self.inner.jobs
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    pub fn helix(&self) -> &CachedHelix {
        &self.inner.helix
    }

    pub fn reconciler(&self) -> &SubscriptionReconciler {
        &self.inner.reconciler
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.inner.verifier
    }

    pub fn dispatcher(&self) -> &WebhookDispatcher {
        &self.inner.dispatcher
    }

    pub fn favourites(&self) -> &FavouritesService {
        &self.inner.favourites
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown_token
    }
}
