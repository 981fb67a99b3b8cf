//! Runtime application configuration loaded from the environment.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "https://api.twitch.tv";
pub const DEFAULT_AUTH_BASE_URL: &str = "https://id.twitch.tv";
pub const DEFAULT_TIMEZONE: &str = "Europe/Brussels";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Shared HMAC secret registered with every webhook subscription.
    pub eventsub_secret: String,
    /// Public HTTPS URL of `POST /twitch/eventsub`.
    pub eventsub_callback_url: String,
    pub api_base_url: String,
    pub auth_base_url: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    /// Base64 AES-256 key for credentials at rest.
    pub token_encryption_key: String,
    /// Zone used for the clock time in single-update notifications.
    pub notification_timezone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            eventsub_secret: String::new(),
            eventsub_callback_url: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.into(),
            server_port: 8080,
            data_dir: default_data_dir(),
            token_encryption_key: String::new(),
            notification_timezone: DEFAULT_TIMEZONE.into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Self {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let g = |key: &str| -> String { lookup(key).unwrap_or_default().trim().to_string() };
        let or = |key: &str, default: &str| -> String {
            let v = g(key);
            if v.is_empty() { default.to_string() } else { v }
        };

        let data_dir = {
            let dir = g("STREAM_NOTIFIER_DATA_DIR");
            if dir.is_empty() { default_data_dir() } else { PathBuf::from(dir) }
        };

        Self {
            client_id: g("TWITCH_CLIENT_ID"),
            client_secret: g("TWITCH_CLIENT_SECRET"),
            eventsub_secret: g("TWITCH_EVENTSUB_SECRET"),
            eventsub_callback_url: g("TWITCH_EVENTSUB_CALLBACK_URL"),
            api_base_url: or("TWITCH_API_BASE_URL", DEFAULT_API_BASE_URL),
            auth_base_url: or("TWITCH_AUTH_BASE_URL", DEFAULT_AUTH_BASE_URL),
            server_port: parse_u16(&g("SERVER_PORT"), 8080),
            data_dir,
            token_encryption_key: g("TOKEN_ENCRYPTION_KEY"),
            notification_timezone: or("NOTIFICATION_TIMEZONE", DEFAULT_TIMEZONE),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("notifier.db")
    }
}

/// Priority: STREAM_NOTIFIER_DATA_DIR env var > ~/.stream-notifier
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stream-notifier")
}

fn parse_u16(s: &str, default: u16) -> u16 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}
