use notifier_db::Database;

use crate::config::{validation, AppConfig, ConfigError};

/// Load settings, refuse to start without the webhook essentials, open the
/// database.
pub fn init_foundation() -> Result<(Database, AppConfig), anyhow::Error> {
    load_dotenv();
    let config = AppConfig::load();

    let status = validation::check(&config);
    for warning in &status.warnings {
        tracing::warn!("Config: {warning}");
    }
    if !status.webhook_ready {
        tracing::error!(missing = ?status.missing_settings, "Required settings missing");
        return Err(ConfigError::MissingSettings(status.missing_settings).into());
    }
    if !status.helix_configured {
        tracing::warn!("Twitch API credentials incomplete; subscription management will fail");
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let db_path = config.database_path();
    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    tracing::info!("Settings loaded (port={})", config.server_port);
    Ok((db, config))
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}
