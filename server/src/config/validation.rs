//! Setting value validation.

use std::sync::LazyLock;

use regex::Regex;

use super::{AppConfig, ConfigStatus};

static RE_HTTPS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://[A-Za-z0-9.\-]+(:\d+)?(/\S*)?$").unwrap());
static RE_HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[A-Za-z0-9.\-]+(:\d+)?/?$").unwrap());
static RE_CLIENT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9]{30}$").unwrap());
static RE_AES_KEY_B64: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/]{43}=$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "TWITCH_CLIENT_ID" => {
            if !RE_CLIENT_ID.is_match(value) {
                return Err("must be 30 lowercase alphanumeric characters".into());
            }
        }
        "TWITCH_EVENTSUB_SECRET" => {
            // Twitch rejects secrets outside 10-100 ASCII characters.
            if !value.is_ascii() || !(10..=100).contains(&value.len()) {
                return Err("must be 10-100 ASCII characters".into());
            }
        }
        "TWITCH_EVENTSUB_CALLBACK_URL" => {
            if !RE_HTTPS_URL.is_match(value) {
                return Err("must be an https:// URL".into());
            }
        }
        "TWITCH_API_BASE_URL" | "TWITCH_AUTH_BASE_URL" => {
            if !RE_HTTP_URL.is_match(value) {
                return Err("must be an http(s) origin without path".into());
            }
        }
        "TOKEN_ENCRYPTION_KEY" => {
            if !RE_AES_KEY_B64.is_match(value) {
                return Err("must be a base64-encoded 32-byte key".into());
            }
        }
        "NOTIFICATION_TIMEZONE" => {
            value
                .parse::<chrono_tz::Tz>()
                .map_err(|_| format!("unknown timezone '{value}'"))?;
        }
        _ => {}
    }
    Ok(())
}

/// Check a loaded configuration.
///
/// Settings the webhook receiver cannot work without are reported as
/// missing; everything else that is absent or malformed is a warning.
pub fn check(config: &AppConfig) -> ConfigStatus {
    let mut missing_settings = Vec::new();
    let mut warnings = Vec::new();

    let settings = [
        ("TWITCH_EVENTSUB_SECRET", config.eventsub_secret.as_str(), true),
        ("TOKEN_ENCRYPTION_KEY", config.token_encryption_key.as_str(), true),
        ("TWITCH_CLIENT_ID", config.client_id.as_str(), false),
        ("TWITCH_CLIENT_SECRET", config.client_secret.as_str(), false),
        ("TWITCH_EVENTSUB_CALLBACK_URL", config.eventsub_callback_url.as_str(), false),
        ("TWITCH_API_BASE_URL", config.api_base_url.as_str(), false),
        ("TWITCH_AUTH_BASE_URL", config.auth_base_url.as_str(), false),
        ("NOTIFICATION_TIMEZONE", config.notification_timezone.as_str(), false),
    ];

    for (key, value, required) in settings {
        if value.is_empty() {
            if required {
                missing_settings.push(key.to_string());
            } else {
                warnings.push(format!("{key} is not set"));
            }
            continue;
        }
        if let Err(e) = validate_setting(key, value) {
            if required {
                missing_settings.push(key.to_string());
            }
            warnings.push(format!("{key} {e}"));
        }
    }

    let helix_configured = !config.client_id.is_empty()
        && !config.client_secret.is_empty()
        && !config.eventsub_callback_url.is_empty();

    ConfigStatus {
        webhook_ready: missing_settings.is_empty(),
        helix_configured,
        missing_settings,
        warnings,
    }
}
