//! Append-only log of received Twitch events.

use chrono::Utc;
use rusqlite::Row;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Database, DbError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTwitchEvent {
    /// Upstream event id; `None` for event types that carry none.
    pub event_id: Option<String>,
    pub event_type: String,
    pub streamer_id: String,
    pub streamer_name: String,
    pub payload: Value,
    /// Unix seconds.
    pub occurred_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchEvent {
    pub id: i64,
    pub event_id: Option<String>,
    pub event_type: String,
    pub streamer_id: String,
    pub streamer_name: String,
    pub payload: Value,
    pub occurred_at: i64,
    pub received_at: i64,
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<TwitchEvent> {
    let payload: String = row.get(5)?;
    let payload = serde_json::from_str(&payload)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(TwitchEvent {
        id: row.get(0)?,
        event_id: row.get(1)?,
        event_type: row.get(2)?,
        streamer_id: row.get(3)?,
        streamer_name: row.get(4)?,
        payload,
        occurred_at: row.get(6)?,
        received_at: row.get(7)?,
    })
}

impl Database {
    /// Persist an event. Returns `false` when an event with the same
    /// upstream id was already recorded.
    pub fn record_twitch_event(&self, event: &NewTwitchEvent) -> Result<bool, DbError> {
        let payload = serde_json::to_string(&event.payload)
            .map_err(|e| DbError::InvalidData(format!("event payload: {e}")))?;
        let received_at = Utc::now().timestamp();

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO twitch_events
                    (event_id, event_type, streamer_id, streamer_name, payload, occurred_at, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(event_id) DO NOTHING",
                rusqlite::params![
                    event.event_id,
                    event.event_type,
                    event.streamer_id,
                    event.streamer_name,
                    payload,
                    event.occurred_at,
                    received_at,
                ],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Most recent events of a streamer, newest first.
    pub fn recent_events_for_streamer(
        &self,
        streamer_id: &str,
        limit: usize,
    ) -> Result<Vec<TwitchEvent>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, event_id, event_type, streamer_id, streamer_name, payload, occurred_at, received_at
                 FROM twitch_events
                 WHERE streamer_id = ?1
                 ORDER BY occurred_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![streamer_id, limit as i64], event_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_twitch_events(&self, event_type: &str) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM twitch_events WHERE event_type = ?1",
                [event_type],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}
