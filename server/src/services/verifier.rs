//! Authentication of inbound EventSub webhook calls.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use twitch_client::eventsub::verify_signature;

use super::cache::CacheStore;

/// Replay-guard lifetime; matches the oldest message Twitch will deliver.
pub const REPLAY_WINDOW: Duration = Duration::from_secs(600);
const MAX_CLOCK_SKEW_SECS: i64 = 600;

/// The four `Twitch-Eventsub-Message-*` headers, as received.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    pub message_id: Option<String>,
    pub message_type: Option<String>,
    pub timestamp: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("Missing Twitch EventSub headers")]
    MissingHeaders,
    #[error("Twitch EventSub message already received")]
    ReplayDetected,
    #[error("Twitch EventSub message timestamp outside the accepted window")]
    StaleTimestamp,
    #[error("Invalid Twitch EventSub signature")]
    InvalidSignature,
}

impl VerifyError {
    pub fn status_code(self) -> u16 {
        match self {
            Self::MissingHeaders => 400,
            Self::InvalidSignature => 403,
            Self::ReplayDetected => 409,
            Self::StaleTimestamp => 412,
        }
    }
}

#[derive(Clone)]
pub struct SignatureVerifier {
    cache: CacheStore,
    secret: String,
}

impl SignatureVerifier {
    pub fn new(cache: CacheStore, secret: String) -> Self {
        Self { cache, secret }
    }

    pub fn verify(&self, headers: &WebhookHeaders, body: &[u8]) -> Result<(), VerifyError> {
        self.verify_at(headers, body, Utc::now())
    }

    /// Checks run in a fixed order: headers, replay guard, timestamp, HMAC.
    /// The replay guard is recorded before the signature is checked.
    pub fn verify_at(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), VerifyError> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        let (Some(message_id), Some(timestamp), Some(signature)) = (
            present(&headers.message_id),
            present(&headers.timestamp),
            present(&headers.signature),
        ) else {
            tracing::warn!("EventSub request without required headers");
            return Err(VerifyError::MissingHeaders);
        };

        let replay_key = format!("eventsub:{message_id}");
        if !self.cache.add(&replay_key, Value::Bool(true), REPLAY_WINDOW) {
            tracing::warn!(message_id, "EventSub message replayed");
            return Err(VerifyError::ReplayDetected);
        }

        let fresh = DateTime::parse_from_rfc3339(timestamp)
            .map(|sent| (now - sent.with_timezone(&Utc)).abs() <= TimeDelta::seconds(MAX_CLOCK_SKEW_SECS))
            .unwrap_or(false);
        if !fresh {
            tracing::warn!(message_id, timestamp, "EventSub message timestamp rejected");
            return Err(VerifyError::StaleTimestamp);
        }

        if !verify_signature(&self.secret, message_id, timestamp, body, signature) {
            tracing::error!(message_id, "EventSub signature mismatch");
            return Err(VerifyError::InvalidSignature);
        }

        Ok(())
    }
}
