//! Per-user dashboard data.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::app::SharedState;
use crate::services::helix::FOLLOWED_STREAMS_TTL;
use crate::services::live::format_live_streams;
use crate::services::token_manager::TokenError;

use super::{err_json, ApiResult};

/// Live status refreshes faster on the dashboard than elsewhere.
pub const DASHBOARD_STREAMS_TTL: Duration = Duration::from_secs(120);

fn reauthenticate(e: TokenError) -> (StatusCode, Json<Value>) {
    tracing::warn!("Dashboard token check failed: {e}");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": e.to_string(), "reauthenticate": true })),
    )
}

/// GET /api/users/{user_id}/dashboard
pub async fn get_dashboard(State(state): State<SharedState>, Path(user_id): Path<i64>) -> ApiResult {
    let user = state
        .db()
        .get_user(user_id)
        .map_err(|e| err_json(500, &e.to_string()))?
        .ok_or_else(|| err_json(404, "User not found"))?;

    let credentials = state
        .tokens()
        .ensure_fresh_user_tokens(user_id)
        .await
        .map_err(reauthenticate)?;
    let app_token = state
        .tokens()
        .ensure_fresh_app_token()
        .await
        .map_err(reauthenticate)?;

    let helix = state.helix();
    let upstream = |e: twitch_client::TwitchError| {
        tracing::error!(user_id, "Dashboard Twitch call failed: {e}");
        err_json(502, &e.to_string())
    };
    let favourite_ids = state
        .favourites()
        .favourite_streamer_ids(user_id)
        .map_err(|e| err_json(500, &e.to_string()))?;

    let (followed_channels, live_streams, subscriptions, scheduled_streams) = tokio::join!(
        helix.followed_channels(&credentials.access_token, &user.auth_provider_id),
        helix.followed_streams(&credentials.access_token, &user.auth_provider_id, DASHBOARD_STREAMS_TTL),
        helix.api().fetch_subscriptions(&app_token, None),
        helix.scheduled_streams_for(&app_token, &favourite_ids),
    );
    let followed_channels = followed_channels.map_err(upstream)?;
    let live_streams = live_streams.map_err(upstream)?;
    let subscriptions = subscriptions.map_err(upstream)?;

    Ok(Json(json!({
        "followed_channels": followed_channels,
        "live_streams": live_streams,
        "favourite_streamer_ids": favourite_ids,
        "subscriptions": subscriptions,
        "scheduled_streams": scheduled_streams,
    })))
}

/// GET /api/users/{user_id}/live, a text report of followed channels on air
pub async fn get_live_report(
    State(state): State<SharedState>,
    Path(user_id): Path<i64>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let user = state
        .db()
        .get_user(user_id)
        .map_err(|e| err_json(500, &e.to_string()))?
        .ok_or_else(|| err_json(404, "User not found"))?;
    let credentials = state
        .tokens()
        .ensure_fresh_user_tokens(user_id)
        .await
        .map_err(reauthenticate)?;

    let streams = state
        .helix()
        .followed_streams(&credentials.access_token, &user.auth_provider_id, FOLLOWED_STREAMS_TTL)
        .await
        .map_err(|e| {
            tracing::error!(user_id, "Live report Twitch call failed: {e}");
            err_json(502, &e.to_string())
        })?;

    let report = format_live_streams(&streams, chrono::Utc::now());
    Ok(([(CONTENT_TYPE, "text/markdown; charset=utf-8")], report).into_response())
}
