//! Headless server binary.
//!
//! Starts the axum web server and waits for Ctrl+C.

use tracing_subscriber::EnvFilter;

use stream_notifier_lib::app::{Collaborators, SharedState};
use stream_notifier_lib::background;
use stream_notifier_lib::server;
use stream_notifier_lib::shutdown;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting stream notifier");

    let (db, config) = stream_notifier_lib::init_foundation()?;
    let collaborators = Collaborators::twitch(&config, &db);
    let state = SharedState::new(db, config, collaborators)?;

    let server_state = state.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::start_server(server_state).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let s = state.clone();
    tokio::spawn(async move { background::cache_purge_loop(s).await });

    tracing::info!(
        port = state.server_port(),
        "Server running. Press Ctrl+C to stop."
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    shutdown::graceful_shutdown(&state).await;
    if let Err(e) = server_handle.await {
        tracing::warn!("Server task ended abnormally: {e}");
    }
    Ok(())
}
