//! Twitch EventSub webhook endpoint.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use twitch_client::eventsub::{
    HEADER_MESSAGE_ID, HEADER_MESSAGE_SIGNATURE, HEADER_MESSAGE_TIMESTAMP, HEADER_MESSAGE_TYPE,
};

use crate::app::SharedState;
use crate::services::dispatcher::DispatchOutcome;
use crate::services::verifier::WebhookHeaders;

/// Twitch caps notification bodies well below this.
const MAX_WEBHOOK_BODY: usize = 1024 * 1024;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn webhook_headers(headers: &HeaderMap) -> WebhookHeaders {
    WebhookHeaders {
        message_id: header(headers, HEADER_MESSAGE_ID),
        message_type: header(headers, HEADER_MESSAGE_TYPE),
        timestamp: header(headers, HEADER_MESSAGE_TIMESTAMP),
        signature: header(headers, HEADER_MESSAGE_SIGNATURE),
    }
}

/// Middleware in front of `POST /twitch/eventsub`: authenticates the call
/// and hands the untouched body on.
pub async fn verify_signature(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_WEBHOOK_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Unreadable EventSub body: {e}");
            return (StatusCode::BAD_REQUEST, "Unreadable request body").into_response();
        }
    };

    if let Err(e) = state.verifier().verify(&webhook_headers(&parts.headers), &bytes) {
        let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
        return (status, e.to_string()).into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// POST /twitch/eventsub
pub async fn receive(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> Response {
    let webhook = webhook_headers(&headers);
    let message_type = webhook.message_type.as_deref().unwrap_or_default();

    match state
        .dispatcher()
        .dispatch(message_type, webhook.timestamp.as_deref(), &body)
        .await
    {
        Ok(DispatchOutcome::Challenge(challenge)) => {
            (StatusCode::OK, [(CONTENT_TYPE, "text/plain")], challenge).into_response()
        }
        Ok(DispatchOutcome::Acknowledged) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!(message_id = ?webhook.message_id, "Rejected EventSub message: {e}");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}
