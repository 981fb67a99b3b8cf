use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::app::SharedState;
use super::api;

/// Create the axum router with all routes.
pub fn create_router(state: SharedState) -> Router {
    let webhook = Router::new()
        .route("/twitch/eventsub", post(api::eventsub::receive))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::eventsub::verify_signature,
        ));

    Router::new()
        // --- Core ---
        .route("/status", get(status_handler))
        // --- Favourites ---
        .route(
            "/api/users/{user_id}/favourites/{id}",
            post(api::favourites::toggle_favourite),
        )
        .route(
            "/api/users/{user_id}/favourites/{id}/events",
            get(api::favourites::streamer_events),
        )
        .route(
            "/api/users/{user_id}/favourites/{id}/subscriptions",
            put(api::favourites::update_subscriptions),
        )
        // --- Push devices ---
        .route("/api/users/{user_id}/push/subscribe", post(api::push::subscribe))
        // --- Dashboard ---
        .route("/api/users/{user_id}/dashboard", get(api::dashboard::get_dashboard))
        .route("/api/users/{user_id}/live", get(api::dashboard::get_live_report))
        // --- Middleware ---
        .layer(CorsLayer::permissive())
        .merge(webhook)
        .with_state(state)
}

async fn status_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
