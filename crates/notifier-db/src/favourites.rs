//! Favourite streamers owned by users.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::{Database, DbError, OptionalExt, SubscriptionStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavouriteStreamer {
    pub id: i64,
    pub user_id: i64,
    pub streamer_id: String,
    pub streamer_name: String,
    pub subscription_status: SubscriptionStatus,
}

const FAVOURITE_COLUMNS: &str = "id, user_id, streamer_id, streamer_name, subscription_status";

fn favourite_from_row(row: &Row<'_>) -> rusqlite::Result<FavouriteStreamer> {
    Ok(FavouriteStreamer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        streamer_id: row.get(2)?,
        streamer_name: row.get(3)?,
        subscription_status: row.get(4)?,
    })
}

impl Database {
    pub fn create_favourite(
        &self,
        user_id: i64,
        streamer_id: &str,
        streamer_name: &str,
    ) -> Result<FavouriteStreamer, DbError> {
        self.with_conn(|conn| {
            let fav = conn.query_row(
                &format!(
                    "INSERT INTO favourite_streamers (user_id, streamer_id, streamer_name)
                     VALUES (?1, ?2, ?3)
                     RETURNING {FAVOURITE_COLUMNS}"
                ),
                rusqlite::params![user_id, streamer_id, streamer_name],
                favourite_from_row,
            )?;
            Ok(fav)
        })
    }

    pub fn get_favourite(&self, id: i64) -> Result<Option<FavouriteStreamer>, DbError> {
        self.with_conn(|conn| {
            let fav = conn
                .query_row(
                    &format!("SELECT {FAVOURITE_COLUMNS} FROM favourite_streamers WHERE id = ?1"),
                    [id],
                    favourite_from_row,
                )
                .optional()?;
            Ok(fav)
        })
    }

    pub fn find_favourite(
        &self,
        user_id: i64,
        streamer_id: &str,
    ) -> Result<Option<FavouriteStreamer>, DbError> {
        self.with_conn(|conn| {
            let fav = conn
                .query_row(
                    &format!(
                        "SELECT {FAVOURITE_COLUMNS} FROM favourite_streamers
                         WHERE user_id = ?1 AND streamer_id = ?2"
                    ),
                    rusqlite::params![user_id, streamer_id],
                    favourite_from_row,
                )
                .optional()?;
            Ok(fav)
        })
    }

    pub fn list_favourites_for_user(&self, user_id: i64) -> Result<Vec<FavouriteStreamer>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FAVOURITE_COLUMNS} FROM favourite_streamers WHERE user_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([user_id], favourite_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All favourites (of any user) matching a broadcaster id or, failing
    /// that, a broadcaster display name.
    pub fn find_favourites_for_broadcaster(
        &self,
        streamer_id: Option<&str>,
        streamer_name: Option<&str>,
    ) -> Result<Vec<FavouriteStreamer>, DbError> {
        if streamer_id.is_none() && streamer_name.is_none() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FAVOURITE_COLUMNS} FROM favourite_streamers
                 WHERE streamer_id = ?1 OR streamer_name = ?2
                 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![streamer_id, streamer_name], favourite_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_favourite_status(&self, id: i64, status: SubscriptionStatus) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE favourite_streamers SET subscription_status = ?1 WHERE id = ?2",
                rusqlite::params![status, id],
            )?;
            Ok(())
        })
    }

    /// Delete a favourite. Its subscription rows go with it.
    pub fn delete_favourite(&self, id: i64) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM favourite_streamers WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}
