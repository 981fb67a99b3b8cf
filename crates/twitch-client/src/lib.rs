//! Twitch integration client library.
//!
//! Provides the OAuth token endpoint client (refresh + client credentials),
//! the Helix REST client used for EventSub subscription management and
//! followed-channel lookups, and the EventSub webhook message model.

pub mod api;
pub mod auth;
pub mod eventsub;

use serde::{Deserialize, Serialize};

/// User OAuth token data.
///
/// The caller is responsible for persisting this (e.g. via notifier-db).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_at: i64,
}

/// App access token from the client-credentials grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Unified error type for the twitch-client crate.
#[derive(Debug, thiserror::Error)]
pub enum TwitchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Twitch API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl TwitchError {
    /// HTTP status reported by Twitch, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TwitchError::Unauthorized(_) => Some(401),
            TwitchError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// OAuth scopes requested when a user links their Twitch account.
pub const SCOPES: &[&str] = &["user:read:email", "user:read:follows"];
