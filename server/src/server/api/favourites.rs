//! Favourite streamer API.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Deserializer};
use serde_json::json;

use notifier_db::{BatchDelay, SubscriptionType};

use crate::app::SharedState;
use crate::services::favourites::FavouriteError;
use crate::services::reconciler::ReconcileError;

use super::{err_json, ApiResult};

fn favourite_error(e: FavouriteError) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    match e {
        FavouriteError::NotFound(_) => err_json(404, &e.to_string()),
        FavouriteError::Forbidden => err_json(403, &e.to_string()),
        FavouriteError::Db(_) => err_json(500, &e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub streamer_name: String,
}

/// POST /api/users/{user_id}/favourites/{id}, where `id` is the Twitch broadcaster id
pub async fn toggle_favourite(
    State(state): State<SharedState>,
    Path((user_id, streamer_id)): Path<(i64, String)>,
    Json(body): Json<ToggleRequest>,
) -> ApiResult {
    let favourite = state
        .favourites()
        .toggle_favourite(user_id, &streamer_id, &body.streamer_name)
        .await
        .map_err(favourite_error)?;
    Ok(Json(json!({ "favourite": favourite })))
}

/// Tells a present `null` (`Some(None)`) apart from an absent field (`None`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionSettings {
    pub types: Vec<String>,
    #[serde(default, deserialize_with = "present")]
    pub batch_delay: Option<Option<u32>>,
}

/// PUT /api/users/{user_id}/favourites/{id}/subscriptions
pub async fn update_subscriptions(
    State(state): State<SharedState>,
    Path((user_id, id)): Path<(i64, i64)>,
    Json(body): Json<SubscriptionSettings>,
) -> ApiResult {
    let types = body
        .types
        .iter()
        .map(|t| SubscriptionType::from_str(t))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| err_json(422, &e.to_string()))?;
    let batch_delay = body
        .batch_delay
        .map(|delay| delay.map(BatchDelay::new).transpose())
        .transpose()
        .map_err(|e| err_json(422, &e.to_string()))?;

    let favourite = state
        .favourites()
        .owned_by(id, user_id)
        .map_err(favourite_error)?;
    let subscriptions = state
        .reconciler()
        .reconcile_settings(&favourite, &types, batch_delay)
        .await
        .map_err(|e| {
            tracing::error!(favourite_streamer_id = id, "Subscription update failed: {e}");
            match e {
                ReconcileError::Db(_) => err_json(500, &e.to_string()),
                _ => err_json(502, &e.to_string()),
            }
        })?;
    Ok(Json(json!({ "subscriptions": subscriptions })))
}

/// GET /api/users/{user_id}/favourites/{id}/events
pub async fn streamer_events(
    State(state): State<SharedState>,
    Path((user_id, id)): Path<(i64, i64)>,
) -> ApiResult {
    let events = state
        .favourites()
        .streamer_events(id, user_id)
        .map_err(favourite_error)?;
    Ok(Json(json!({ "events": events })))
}
