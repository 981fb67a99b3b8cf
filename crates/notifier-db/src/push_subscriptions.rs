//! Web Push endpoints registered by a user's browsers.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::{Database, DbError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: i64,
    pub user_id: i64,
    pub endpoint: String,
    /// `keys.p256dh` of the browser subscription.
    pub public_key: String,
    /// `keys.auth` of the browser subscription.
    pub auth_token: String,
    pub content_encoding: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPushSubscription {
    pub endpoint: String,
    pub public_key: String,
    pub auth_token: String,
    pub content_encoding: Option<String>,
}

const PUSH_COLUMNS: &str = "id, user_id, endpoint, public_key, auth_token, content_encoding";

fn push_from_row(row: &Row<'_>) -> rusqlite::Result<PushSubscription> {
    Ok(PushSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        endpoint: row.get(2)?,
        public_key: row.get(3)?,
        auth_token: row.get(4)?,
        content_encoding: row.get(5)?,
    })
}

impl Database {
    /// Register a device for `user_id`, or refresh its keys.
    ///
    /// An endpoint belongs to one user at a time: registering an endpoint
    /// known under another user moves it to `user_id`.
    pub fn upsert_push_subscription(
        &self,
        user_id: i64,
        subscription: &NewPushSubscription,
    ) -> Result<PushSubscription, DbError> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO push_subscriptions (user_id, endpoint, public_key, auth_token, content_encoding)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(endpoint) DO UPDATE SET
                         user_id = excluded.user_id,
                         public_key = excluded.public_key,
                         auth_token = excluded.auth_token,
                         content_encoding = excluded.content_encoding,
                         updated_at = strftime('%s', 'now')
                     RETURNING {PUSH_COLUMNS}"
                ),
                rusqlite::params![
                    user_id,
                    subscription.endpoint,
                    subscription.public_key,
                    subscription.auth_token,
                    subscription.content_encoding,
                ],
                push_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn push_subscriptions_for_user(&self, user_id: i64) -> Result<Vec<PushSubscription>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PUSH_COLUMNS} FROM push_subscriptions WHERE user_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([user_id], push_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
