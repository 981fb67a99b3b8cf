//! Per-favourite EventSub subscription rows, at most one per type.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::{BatchDelay, Database, DbError, OptionalExt, SubscriptionStatus, SubscriptionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub favourite_streamer_id: i64,
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    pub status: SubscriptionStatus,
    pub batch_delay: Option<BatchDelay>,
}

const SUBSCRIPTION_COLUMNS: &str = "id, favourite_streamer_id, type, status, batch_delay";

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: row.get(0)?,
        favourite_streamer_id: row.get(1)?,
        subscription_type: row.get(2)?,
        status: row.get(3)?,
        batch_delay: row.get(4)?,
    })
}

impl Database {
    /// Insert the row for (favourite, type) or overwrite its status.
    pub fn upsert_subscription(
        &self,
        favourite_id: i64,
        subscription_type: SubscriptionType,
        status: SubscriptionStatus,
    ) -> Result<Subscription, DbError> {
        self.with_conn(|conn| {
            let sub = conn.query_row(
                &format!(
                    "INSERT INTO subscriptions (favourite_streamer_id, type, status)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(favourite_streamer_id, type) DO UPDATE SET
                         status = excluded.status,
                         updated_at = strftime('%s', 'now')
                     RETURNING {SUBSCRIPTION_COLUMNS}"
                ),
                rusqlite::params![favourite_id, subscription_type, status],
                subscription_from_row,
            )?;
            Ok(sub)
        })
    }

    pub fn get_subscription(
        &self,
        favourite_id: i64,
        subscription_type: SubscriptionType,
    ) -> Result<Option<Subscription>, DbError> {
        self.with_conn(|conn| {
            let sub = conn
                .query_row(
                    &format!(
                        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                         WHERE favourite_streamer_id = ?1 AND type = ?2"
                    ),
                    rusqlite::params![favourite_id, subscription_type],
                    subscription_from_row,
                )
                .optional()?;
            Ok(sub)
        })
    }

    pub fn list_subscriptions(&self, favourite_id: i64) -> Result<Vec<Subscription>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                 WHERE favourite_streamer_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([favourite_id], subscription_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Update the status of an existing row. Returns whether a row matched.
    pub fn set_subscription_status(
        &self,
        favourite_id: i64,
        subscription_type: SubscriptionType,
        status: SubscriptionStatus,
    ) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE subscriptions SET status = ?1, updated_at = strftime('%s', 'now')
                 WHERE favourite_streamer_id = ?2 AND type = ?3",
                rusqlite::params![status, favourite_id, subscription_type],
            )?;
            Ok(updated > 0)
        })
    }

    /// Set the debounce window on the favourite's `channel.update` row.
    pub fn set_batch_delay(
        &self,
        favourite_id: i64,
        batch_delay: Option<BatchDelay>,
    ) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE subscriptions SET batch_delay = ?1, updated_at = strftime('%s', 'now')
                 WHERE favourite_streamer_id = ?2 AND type = ?3",
                rusqlite::params![batch_delay, favourite_id, SubscriptionType::ChannelUpdate],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn delete_subscription(
        &self,
        favourite_id: i64,
        subscription_type: SubscriptionType,
    ) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM subscriptions WHERE favourite_streamer_id = ?1 AND type = ?2",
                rusqlite::params![favourite_id, subscription_type],
            )?;
            Ok(deleted > 0)
        })
    }
}
