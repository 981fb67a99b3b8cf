use super::*;

const FOLLOWED_PAGE_SIZE: u32 = 100;

impl TwitchApiClient {
    /// Get one page of channels followed by the specified user.
    pub async fn get_followed_channels_page(
        &self,
        token: &str,
        user_id: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<FollowedChannelsPage, TwitchError> {
        let clamped = first.clamp(1, 100).to_string();
        let mut query = vec![("user_id", user_id), ("first", clamped.as_str())];
        if let Some(cursor) = after.filter(|v| !v.is_empty()) {
            query.push(("after", cursor));
        }
        let url = self.helix_query_url("/channels/followed", &query)?;
        let body = self.authenticated_get(&url, token).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Walk every page of followed channels and merge them into one list.
    ///
    /// A failing page aborts the whole walk; there is no retry.
    pub async fn get_all_followed_channels(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<FollowedChannelsPage, TwitchError> {
        let mut all = Vec::new();
        let mut total = None;
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .get_followed_channels_page(token, user_id, FOLLOWED_PAGE_SIZE, cursor.as_deref())
                .await?;
            total.get_or_insert(page.total);
            let page_len = page.data.len();
            all.extend(page.data);

            cursor = page.pagination.and_then(|p| p.cursor);
            if cursor.is_none() || page_len == 0 {
                break;
            }
        }

        Ok(FollowedChannelsPage {
            total: total.unwrap_or(all.len() as u64),
            data: all,
            pagination: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn followed_channels_page_deserializes_total_and_cursor() {
        let body = r#"{
          "total": 120,
          "data": [{
            "broadcaster_id": "123456",
            "broadcaster_login": "teststreamer",
            "broadcaster_name": "TestStreamer",
            "followed_at": "2024-01-01T00:00:00Z"
          }],
          "pagination": { "cursor": "next-cursor" }
        }"#;

        let parsed: FollowedChannelsPage = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.total, 120);
        assert_eq!(parsed.data[0].broadcaster_login, "teststreamer");
        assert_eq!(
            parsed.pagination.and_then(|p| p.cursor),
            Some("next-cursor".to_string())
        );
    }

    #[test]
    fn last_page_has_no_cursor() {
        let body = r#"{"total": 1, "data": [], "pagination": {}}"#;
        let parsed: FollowedChannelsPage = serde_json::from_str(body).unwrap();
        assert!(parsed.pagination.and_then(|p| p.cursor).is_none());
    }
}
