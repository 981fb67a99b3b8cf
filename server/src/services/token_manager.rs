//! Lifecycle of the per-user OAuth token and the app access token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use twitch_client::auth::TwitchAuth;
use twitch_client::{AppToken, Token, TwitchError};

use notifier_db::{Database, DbError, TokenCipher, UserCredentials};

use super::cache::CacheStore;

/// A user token with less validity than this is refreshed before use.
pub const USER_TOKEN_MIN_VALIDITY_SECS: i64 = 900;
pub const APP_TOKEN_CACHE_KEY: &str = "twitch_app_access_token";
/// Subtracted from the app token's `expires_in` to get its cache TTL.
pub const APP_TOKEN_SAFETY_MARGIN_SECS: i64 = 3600;

/// OAuth token endpoint operations.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn refresh_user_token(&self, refresh_token: &str) -> Result<Token, TwitchError>;
    async fn app_token(&self) -> Result<AppToken, TwitchError>;
}

#[async_trait]
impl TokenEndpoint for TwitchAuth {
    async fn refresh_user_token(&self, refresh_token: &str) -> Result<Token, TwitchError> {
        self.refresh_token(refresh_token).await
    }

    async fn app_token(&self) -> Result<AppToken, TwitchError> {
        self.client_credentials().await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("User {0} has no stored Twitch credentials")]
    MissingCredentials(i64),

    #[error("Twitch token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Twitch app access token unavailable: {0}")]
    AppTokenUnavailable(String),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

pub struct TokenManager {
    db: Database,
    cipher: TokenCipher,
    cache: CacheStore,
    endpoint: Arc<dyn TokenEndpoint>,
    user_locks: StdMutex<HashMap<i64, Arc<Mutex<()>>>>,
    app_lock: Mutex<()>,
}

fn is_fresh(credentials: &UserCredentials, now: i64) -> bool {
    credentials.expires_at > now + USER_TOKEN_MIN_VALIDITY_SECS
}

impl TokenManager {
    pub fn new(
        db: Database,
        cipher: TokenCipher,
        cache: CacheStore,
        endpoint: Arc<dyn TokenEndpoint>,
    ) -> Self {
        Self {
            db,
            cipher,
            cache,
            endpoint,
            user_locks: StdMutex::new(HashMap::new()),
            app_lock: Mutex::new(()),
        }
    }

    pub fn cipher(&self) -> &TokenCipher {
        &self.cipher
    }

    fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(user_id).or_default())
    }

    fn fail(&self, user_id: i64, err: TokenError) -> TokenError {
        if let Err(e) = self.db.clear_user_credentials(user_id) {
            tracing::error!(user_id, "Failed to clear Twitch credentials: {e}");
        }
        err
    }

    fn load(&self, user_id: i64) -> Result<UserCredentials, TokenError> {
        match self.db.get_user_credentials(user_id, &self.cipher)? {
            Some(credentials) => Ok(credentials),
            None => {
                tracing::warn!(user_id, "No Twitch credentials stored");
                Err(self.fail(user_id, TokenError::MissingCredentials(user_id)))
            }
        }
    }

    /// Return usable user credentials, refreshing them when they expire
    /// within 15 minutes.
    ///
    /// Refreshes are single-flight per user: the credentials are read again
    /// after taking the user's lock, so a refresh completed meanwhile is
    /// reused. Any failure clears the stored credentials.
    pub async fn ensure_fresh_user_tokens(&self, user_id: i64) -> Result<UserCredentials, TokenError> {
        let current = self.load(user_id)?;
        if is_fresh(&current, Utc::now().timestamp()) {
            return Ok(current);
        }

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let current = self.load(user_id)?;
        if is_fresh(&current, Utc::now().timestamp()) {
            tracing::info!(user_id, "Token already refreshed by another request; reusing it");
            return Ok(current);
        }

        let token = match self.endpoint.refresh_user_token(&current.refresh_token).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(user_id, "Failed to refresh Twitch tokens: {e}");
                return Err(self.fail(user_id, TokenError::RefreshFailed(e.to_string())));
            }
        };

        if token.access_token.is_empty()
            || token.refresh_token.is_empty()
            || token.expires_at <= Utc::now().timestamp()
        {
            tracing::warn!(user_id, "Incomplete Twitch token refresh response");
            return Err(self.fail(
                user_id,
                TokenError::RefreshFailed("incomplete token response".into()),
            ));
        }

        let refreshed = UserCredentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
        };
        self.db
            .save_user_credentials(user_id, &refreshed, &self.cipher)?;
        tracing::info!(user_id, expires_at = refreshed.expires_at, "Twitch tokens refreshed");
        Ok(refreshed)
    }

    /// Return the cached app access token, requesting a new one on a miss.
    ///
    /// Misses are serialized by a process-wide lock with a re-check, so
    /// concurrent callers trigger one client-credentials request.
    pub async fn ensure_fresh_app_token(&self) -> Result<String, TokenError> {
        if let Some(token) = self.cache.get_as::<String>(APP_TOKEN_CACHE_KEY) {
            return Ok(token);
        }

        let _guard = self.app_lock.lock().await;
        if let Some(token) = self.cache.get_as::<String>(APP_TOKEN_CACHE_KEY) {
            return Ok(token);
        }

        let app = self.endpoint.app_token().await.map_err(|e| {
            tracing::error!("Failed to get Twitch app access token: {e}");
            TokenError::AppTokenUnavailable(e.to_string())
        })?;
        if app.access_token.is_empty() || app.expires_in <= 0 {
            return Err(TokenError::AppTokenUnavailable(
                "incomplete app token response".into(),
            ));
        }

        let ttl = app.expires_in - APP_TOKEN_SAFETY_MARGIN_SECS;
        if ttl > 0 {
            self.cache.put(
                APP_TOKEN_CACHE_KEY,
                Value::String(app.access_token.clone()),
                Duration::from_secs(ttl as u64),
            );
        } else {
            tracing::warn!(expires_in = app.expires_in, "App token too short-lived to cache");
        }

        tracing::info!(expires_in = app.expires_in, "Obtained new Twitch app access token");
        Ok(app.access_token)
    }
}
