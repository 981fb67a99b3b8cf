//! OAuth token endpoint client for Twitch.
//!
//! Handles user token refresh, the app client-credentials grant and
//! token validation against `/oauth2/validate`.

use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::{AppToken, SCOPES, Token, TwitchError};

const AUTH_BASE: &str = "https://id.twitch.tv";

/// Twitch OAuth token response from the token endpoint.
///
/// Every field is optional so that an incomplete reply is reported as a
/// refresh failure instead of a JSON error.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<Vec<String>>,
}

/// Twitch OAuth error response.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

/// Client for the Twitch OAuth token endpoints.
///
/// The caller is responsible for persisting tokens.
/// This struct does not depend on notifier-db directly.
#[derive(Clone)]
pub struct TwitchAuth {
    client_id: String,
    client_secret: String,
    base_url: String,
    http: reqwest::Client,
}

impl TwitchAuth {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_base_url(client_id, client_secret, AUTH_BASE.to_string())
    }

    /// Create a client against a custom identity host (mock servers, proxies).
    pub fn with_base_url(client_id: String, client_secret: String, base_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, TwitchError> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }

    /// Exchange a refresh token for a new access/refresh/expiry triple.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Token, TwitchError> {
        tracing::info!("Refreshing Twitch OAuth token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let resp = self
            .http
            .post(self.endpoint("/oauth2/token")?)
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        parse_user_token(status, &body)
    }

    /// Obtain an app access token via the client-credentials grant.
    pub async fn client_credentials(&self) -> Result<AppToken, TwitchError> {
        tracing::info!("Requesting Twitch app access token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let resp = self
            .http
            .post(self.endpoint("/oauth2/token")?)
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        parse_app_token(status, &body)
    }
}

fn error_from_response(status: StatusCode, body: &str) -> TwitchError {
    let err: ErrorResponse = serde_json::from_str(body).unwrap_or(ErrorResponse {
        error: Some(status.to_string()),
        message: None,
        error_description: Some(body.to_string()),
    });
    let detail = format!(
        "{}: {}",
        err.error.unwrap_or_default(),
        err.error_description.or(err.message).unwrap_or_default()
    );

    if status == StatusCode::UNAUTHORIZED {
        TwitchError::Unauthorized(detail)
    } else {
        TwitchError::TokenRefreshFailed(detail)
    }
}

/// Parse a refresh-grant reply into a [`Token`].
fn parse_user_token(status: StatusCode, body: &str) -> Result<Token, TwitchError> {
    if !status.is_success() {
        return Err(error_from_response(status, body));
    }

    let token_resp: TokenResponse = serde_json::from_str(body)
        .map_err(|e| TwitchError::TokenRefreshFailed(format!("failed to parse response: {e}")))?;

    let (Some(access_token), Some(refresh_token), Some(expires_in)) = (
        token_resp.access_token.filter(|t| !t.is_empty()),
        token_resp.refresh_token.filter(|t| !t.is_empty()),
        token_resp.expires_in.filter(|e| *e > 0),
    ) else {
        return Err(TwitchError::TokenRefreshFailed(
            "incomplete token response".into(),
        ));
    };

    let scope = token_resp
        .scope
        .map(|s| s.join(" "))
        .unwrap_or_else(|| SCOPES.join(" "));

    Ok(Token {
        access_token,
        refresh_token,
        scope,
        expires_at: Utc::now().timestamp() + expires_in,
    })
}

/// Parse a client-credentials reply into an [`AppToken`].
fn parse_app_token(status: StatusCode, body: &str) -> Result<AppToken, TwitchError> {
    if !status.is_success() {
        return Err(error_from_response(status, body));
    }

    let token_resp: TokenResponse = serde_json::from_str(body)
        .map_err(|e| TwitchError::TokenRefreshFailed(format!("failed to parse response: {e}")))?;

    match (
        token_resp.access_token.filter(|t| !t.is_empty()),
        token_resp.expires_in.filter(|e| *e > 0),
    ) {
        (Some(access_token), Some(expires_in)) => Ok(AppToken {
            access_token,
            expires_in,
        }),
        _ => Err(TwitchError::TokenRefreshFailed(
            "incomplete app token response".into(),
        )),
    }
}
