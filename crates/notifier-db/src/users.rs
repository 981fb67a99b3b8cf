//! Users and their encrypted OAuth credentials.

use serde::{Deserialize, Serialize};

use crate::{Database, DbError, OptionalExt, TokenCipher};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Twitch user id.
    pub auth_provider_id: String,
}

/// Decrypted credential triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl Database {
    /// Insert a user or refresh the display name of an existing one.
    pub fn upsert_user(&self, auth_provider_id: &str, name: &str) -> Result<User, DbError> {
        self.with_conn(|conn| {
            let user = conn.query_row(
                "INSERT INTO users (auth_provider_id, name) VALUES (?1, ?2)
                 ON CONFLICT(auth_provider_id) DO UPDATE SET name = excluded.name
                 RETURNING id, name, auth_provider_id",
                rusqlite::params![auth_provider_id, name],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        auth_provider_id: row.get(2)?,
                    })
                },
            )?;
            Ok(user)
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>, DbError> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, name, auth_provider_id FROM users WHERE id = ?1",
                    [user_id],
                    |row| {
                        Ok(User {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            auth_provider_id: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Read and decrypt a user's credentials.
    ///
    /// Returns `None` when the access or refresh token is missing. A missing
    /// expiry is read as already expired.
    pub fn get_user_credentials(
        &self,
        user_id: i64,
        cipher: &TokenCipher,
    ) -> Result<Option<UserCredentials>, DbError> {
        let row: Option<(Option<String>, Option<String>, Option<String>)> =
            self.with_conn(|conn| {
                let row = conn
                    .query_row(
                        "SELECT auth_provider_access_token, auth_provider_refresh_token, auth_provider_expires_at
                         FROM users WHERE id = ?1",
                        [user_id],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;
                Ok(row)
            })?;

        let Some((Some(access), Some(refresh), expires)) = row else {
            return Ok(None);
        };

        let access_token = cipher.decrypt(&access)?;
        let refresh_token = cipher.decrypt(&refresh)?;
        if access_token.is_empty() || refresh_token.is_empty() {
            return Ok(None);
        }
        let expires_at = match expires {
            Some(sealed) => cipher
                .decrypt(&sealed)?
                .parse::<i64>()
                .map_err(|e| DbError::InvalidData(format!("expires_at: {e}")))?,
            None => 0,
        };

        Ok(Some(UserCredentials {
            access_token,
            refresh_token,
            expires_at,
        }))
    }

    /// Encrypt and store a credential triple, replacing the previous one.
    pub fn save_user_credentials(
        &self,
        user_id: i64,
        credentials: &UserCredentials,
        cipher: &TokenCipher,
    ) -> Result<(), DbError> {
        let access = cipher.encrypt(&credentials.access_token)?;
        let refresh = cipher.encrypt(&credentials.refresh_token)?;
        let expires = cipher.encrypt(&credentials.expires_at.to_string())?;

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET auth_provider_access_token = ?1,
                                  auth_provider_refresh_token = ?2,
                                  auth_provider_expires_at = ?3
                 WHERE id = ?4",
                rusqlite::params![access, refresh, expires, user_id],
            )?;
            if updated == 0 {
                return Err(DbError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        })
    }

    /// Clear all three credential fields, forcing re-authentication.
    pub fn clear_user_credentials(&self, user_id: i64) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET auth_provider_access_token = NULL,
                                  auth_provider_refresh_token = NULL,
                                  auth_provider_expires_at = NULL
                 WHERE id = ?1",
                [user_id],
            )?;
            Ok(())
        })
    }
}
