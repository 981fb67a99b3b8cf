use serde::Serialize;

use super::*;

/// Body of POST /helix/eventsub/subscriptions for a webhook transport.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSubscriptionRequest {
    #[serde(rename = "type")]
    pub subscription_type: String,
    pub version: String,
    pub condition: EventSubCondition,
    pub transport: WebhookTransport,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookTransport {
    pub method: String,
    pub callback: String,
    pub secret: String,
}

impl CreateSubscriptionRequest {
    /// Version-1 webhook subscription for one broadcaster.
    pub fn webhook(
        subscription_type: &str,
        broadcaster_id: &str,
        callback: &str,
        secret: &str,
    ) -> Self {
        Self {
            subscription_type: subscription_type.to_string(),
            version: "1".into(),
            condition: EventSubCondition {
                broadcaster_user_id: Some(broadcaster_id.to_string()),
            },
            transport: WebhookTransport {
                method: "webhook".into(),
                callback: callback.to_string(),
                secret: secret.to_string(),
            },
        }
    }
}

impl TwitchApiClient {
    /// List EventSub subscriptions, following pagination cursors.
    ///
    /// Helix filters are mutually exclusive: with a broadcaster the list is
    /// filtered by `user_id`, otherwise by `type=stream.online`.
    pub async fn get_eventsub_subscriptions(
        &self,
        token: &str,
        broadcaster_id: Option<&str>,
    ) -> Result<EventSubSubscriptionList, TwitchError> {
        let filter = match broadcaster_id.filter(|id| !id.is_empty()) {
            Some(id) => ("user_id", id),
            None => ("type", "stream.online"),
        };
        let mut merged = EventSubSubscriptionList::default();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![filter];
            if let Some(after) = cursor.as_deref() {
                query.push(("after", after));
            }
            let url = self.helix_query_url("/eventsub/subscriptions", &query)?;
            let body = self.authenticated_get(&url, token).await?;
            let page: EventSubSubscriptionList = serde_json::from_str(&body)?;

            merged.total = page.total;
            merged.total_cost = page.total_cost;
            merged.max_total_cost = page.max_total_cost;
            let page_len = page.data.len();
            merged.data.extend(page.data);

            cursor = next_cursor(page.pagination, page_len);
            if cursor.is_none() {
                break;
            }
        }

        Ok(merged)
    }

    /// Create an EventSub subscription. Twitch returns the created row in `data`.
    pub async fn create_eventsub_subscription(
        &self,
        token: &str,
        request: &CreateSubscriptionRequest,
    ) -> Result<EventSubSubscriptionList, TwitchError> {
        let url = self.helix_url("/eventsub/subscriptions");
        tracing::info!(
            subscription_type = %request.subscription_type,
            broadcaster_id = ?request.condition.broadcaster_user_id,
            "Creating EventSub subscription"
        );
        let body = self.authenticated_post(&url, token, request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Delete an EventSub subscription by id.
    pub async fn delete_eventsub_subscription(
        &self,
        token: &str,
        subscription_id: &str,
    ) -> Result<(), TwitchError> {
        let url = self.helix_query_url("/eventsub/subscriptions", &[("id", subscription_id)])?;
        self.authenticated_delete(&url, token).await
    }
}

/// The cursor for the next page, or `None` once Twitch stops returning one
/// (an empty page also ends the walk).
fn next_cursor(pagination: Option<HelixPagination>, page_len: usize) -> Option<String> {
    if page_len == 0 {
        return None;
    }
    pagination.and_then(|p| p.cursor).filter(|c| !c.is_empty())
}
