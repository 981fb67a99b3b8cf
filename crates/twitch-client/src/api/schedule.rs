use super::*;

impl TwitchApiClient {
    /// Broadcast schedule of a broadcaster.
    ///
    /// Twitch answers 404 for channels without a schedule; that is reported
    /// as `Ok(None)`.
    pub async fn get_broadcast_schedule(
        &self,
        token: &str,
        broadcaster_id: &str,
    ) -> Result<Option<BroadcastSchedule>, TwitchError> {
        let url = self.helix_query_url("/schedule", &[("broadcaster_id", broadcaster_id)])?;
        match self.authenticated_get(&url, token).await {
            Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_deserializes_with_null_segments() {
        let body = r#"{
          "data": {
            "segments": null,
            "broadcaster_id": "123456",
            "broadcaster_name": "TestStreamer",
            "broadcaster_login": "teststreamer",
            "vacation": null
          },
          "pagination": {}
        }"#;
        let parsed: BroadcastSchedule = serde_json::from_str(body).unwrap();
        assert!(parsed.data.segments.is_none());
    }

    #[test]
    fn schedule_segment_fields() {
        let body = r#"{
          "data": {
            "segments": [{
              "id": "seg-1",
              "start_time": "2030-01-01T18:00:00Z",
              "end_time": "2030-01-01T20:00:00Z",
              "title": "Weekly stream",
              "canceled_until": null,
              "category": {"id": "509658", "name": "Just Chatting"},
              "is_recurring": true
            }],
            "broadcaster_id": "123456",
            "broadcaster_name": "TestStreamer",
            "broadcaster_login": "teststreamer"
          }
        }"#;
        let parsed: BroadcastSchedule = serde_json::from_str(body).unwrap();
        let segments = parsed.data.segments.unwrap();
        assert_eq!(segments[0].title, "Weekly stream");
        assert!(segments[0].is_recurring);
        assert_eq!(segments[0].category.as_ref().unwrap().name, "Just Chatting");
    }
}
