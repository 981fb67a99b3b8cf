use super::*;

impl TwitchApiClient {
    /// Live streams among the channels the user follows.
    pub async fn get_followed_streams(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<HelixPaginatedResponse<StreamInfo>, TwitchError> {
        let url = self.helix_query_url("/streams/followed", &[("user_id", user_id)])?;
        let body = self.authenticated_get(&url, token).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
