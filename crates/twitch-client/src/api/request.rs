use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;

use super::*;

impl TwitchApiClient {
    pub fn new(client_id: String) -> Self {
        Self::with_base_url(client_id, HELIX_BASE.to_string())
    }

    /// Create a client against a custom API host. `/helix` is appended per request.
    pub fn with_base_url(client_id: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build auth headers from the given access token.
    fn auth_headers(&self, token: &str) -> Result<HeaderMap, TwitchError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| TwitchError::InvalidHeader("Authorization".into()))?;
        let client_id = HeaderValue::from_str(&self.client_id)
            .map_err(|_| TwitchError::InvalidHeader("Client-Id".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("Client-Id", client_id);
        Ok(headers)
    }

    /// Map a finished response to its body, or to `Unauthorized` / `ApiError`.
    async fn read_response(url: &str, resp: reqwest::Response) -> Result<String, TwitchError> {
        let status = resp.status();
        let body = resp.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(url, "Got 401, caller should refresh token and retry");
            return Err(TwitchError::Unauthorized(body));
        }

        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "Twitch API request failed");
            return Err(TwitchError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    /// Execute a GET request with auth headers.
    pub(super) async fn authenticated_get(
        &self,
        url: &str,
        token: &str,
    ) -> Result<String, TwitchError> {
        let headers = self.auth_headers(token)?;
        let resp = self.http.get(url).headers(headers).send().await?;
        Self::read_response(url, resp).await
    }

    /// Execute a POST request with auth headers and JSON body.
    pub(super) async fn authenticated_post(
        &self,
        url: &str,
        token: &str,
        body: &impl Serialize,
    ) -> Result<String, TwitchError> {
        let headers = self.auth_headers(token)?;
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        Self::read_response(url, resp).await
    }

    /// Execute a DELETE request with auth headers.
    pub(super) async fn authenticated_delete(
        &self,
        url: &str,
        token: &str,
    ) -> Result<(), TwitchError> {
        let headers = self.auth_headers(token)?;
        let resp = self.http.delete(url).headers(headers).send().await?;
        Self::read_response(url, resp).await?;
        Ok(())
    }
}
