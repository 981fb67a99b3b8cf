//! Send a test push notification to one user.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stream_notifier_lib::app::Collaborators;
use stream_notifier_lib::notification::manual::{TEST_BROADCASTER, send_test_notification};

/// Push a "stream started" message to a user's registered devices.
#[derive(Parser)]
#[command(name = "stream-notifier-test-notification")]
struct Args {
    /// Internal id of the user to notify.
    #[arg(long)]
    user_id: i64,

    /// Broadcaster name shown in the message.
    #[arg(long, default_value = TEST_BROADCASTER)]
    broadcaster: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let (db, config) = stream_notifier_lib::init_foundation()?;
    let collaborators = Collaborators::twitch(&config, &db);
    let user = send_test_notification(&db, collaborators.sink.as_ref(), args.user_id, &args.broadcaster).await?;

    println!("Notification sent to user {} ({})", user.id, user.name);
    Ok(())
}
