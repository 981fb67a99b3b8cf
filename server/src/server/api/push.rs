//! Web Push device registration.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_ENCODING;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use notifier_db::NewPushSubscription;

use crate::app::SharedState;

use super::err_json;

#[derive(Debug, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// `PushSubscription.toJSON()` as sent by the browser.
#[derive(Debug, Deserialize)]
pub struct PushSubscribeRequest {
    pub endpoint: String,
    pub keys: PushKeys,
}

/// POST /api/users/{user_id}/push/subscribe
pub async fn subscribe(
    State(state): State<SharedState>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<PushSubscribeRequest>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    for (field, value) in [
        ("endpoint", &body.endpoint),
        ("keys.p256dh", &body.keys.p256dh),
        ("keys.auth", &body.keys.auth),
    ] {
        if value.trim().is_empty() {
            return Err(err_json(422, &format!("{field} is required")));
        }
    }

    state
        .db()
        .get_user(user_id)
        .map_err(|e| err_json(500, &e.to_string()))?
        .ok_or_else(|| err_json(404, "User not found"))?;

    let content_encoding = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let device = NewPushSubscription {
        endpoint: body.endpoint,
        public_key: body.keys.p256dh,
        auth_token: body.keys.auth,
        content_encoding,
    };
    state
        .db()
        .upsert_push_subscription(user_id, &device)
        .map_err(|e| err_json(500, &e.to_string()))?;

    tracing::debug!(user_id, "Push subscription updated");
    Ok(StatusCode::NO_CONTENT)
}
