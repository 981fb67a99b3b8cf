use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

fn signing_mac(secret: &str, message_id: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    Some(mac)
}

/// `sha256=<hex>` signature over `message_id ∥ timestamp ∥ body`.
pub fn compute_signature(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    body: &[u8],
) -> Option<String> {
    let digest = signing_mac(secret, message_id, timestamp, body)?
        .finalize()
        .into_bytes();
    Some(format!("{SIGNATURE_PREFIX}{}", hex::encode(digest)))
}

/// Constant-time check of a `Twitch-Eventsub-Message-Signature` value.
pub fn verify_signature(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    body: &[u8],
    provided: &str,
) -> bool {
    let Some(hex_sig) = provided.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    signing_mac(secret, message_id, timestamp, body)
        .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
}
