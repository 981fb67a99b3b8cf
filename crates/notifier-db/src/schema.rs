//! Database schema definitions.

use rusqlite::Connection;

use crate::DbError;

pub fn create_tables(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    conn.execute_batch(INDEXES)?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    auth_provider_id TEXT NOT NULL UNIQUE,
    auth_provider_access_token TEXT,
    auth_provider_refresh_token TEXT,
    auth_provider_expires_at TEXT,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);

CREATE TABLE IF NOT EXISTS favourite_streamers (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    streamer_id TEXT NOT NULL,
    streamer_name TEXT NOT NULL,
    subscription_status TEXT NOT NULL DEFAULT 'unsubscribed',
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    UNIQUE(user_id, streamer_id)
);

CREATE TABLE IF NOT EXISTS subscriptions (
    id INTEGER PRIMARY KEY,
    favourite_streamer_id INTEGER NOT NULL REFERENCES favourite_streamers(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    batch_delay INTEGER,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    UNIQUE(favourite_streamer_id, type)
);

CREATE TABLE IF NOT EXISTS twitch_events (
    id INTEGER PRIMARY KEY,
    event_id TEXT UNIQUE,
    event_type TEXT NOT NULL,
    streamer_id TEXT NOT NULL,
    streamer_name TEXT NOT NULL DEFAULT '',
    payload TEXT NOT NULL,
    occurred_at INTEGER NOT NULL,
    received_at INTEGER NOT NULL
);

-- Web Push endpoints, one row per browser/device.
CREATE TABLE IF NOT EXISTS push_subscriptions (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    endpoint TEXT NOT NULL UNIQUE,
    public_key TEXT NOT NULL,
    auth_token TEXT NOT NULL,
    content_encoding TEXT,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_favourite_streamers_streamer_id
    ON favourite_streamers(streamer_id);
CREATE INDEX IF NOT EXISTS idx_favourite_streamers_streamer_name
    ON favourite_streamers(streamer_name);
CREATE INDEX IF NOT EXISTS idx_twitch_events_streamer_occurred
    ON twitch_events(streamer_id, occurred_at DESC);
CREATE INDEX IF NOT EXISTS idx_push_subscriptions_user
    ON push_subscriptions(user_id);
"#;
