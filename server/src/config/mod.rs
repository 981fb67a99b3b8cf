//! Configuration management: defaults, validation, loading from the environment.

pub mod app_config;
pub mod validation;

pub use app_config::AppConfig;

use serde::{Deserialize, Serialize};

/// Outcome of validating the loaded configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigStatus {
    /// Webhook verification and credential storage can run.
    pub webhook_ready: bool,
    /// Outbound Helix calls (subscriptions, dashboard) can run.
    pub helix_configured: bool,
    pub missing_settings: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required settings: {0:?}")]
    MissingSettings(Vec<String>),

    #[error("Invalid setting {key}: {message}")]
    Invalid { key: String, message: String },
}
