//! SQLite database layer for the stream notifier.

pub mod crypto;
pub mod events;
pub mod favourites;
pub mod models;
pub mod push_subscriptions;
pub mod schema;
pub mod subscriptions;
pub mod users;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub use crypto::{CryptoError, TokenCipher};
pub use events::{NewTwitchEvent, TwitchEvent};
pub use favourites::FavouriteStreamer;
pub use models::{BatchDelay, SubscriptionStatus, SubscriptionType};
pub use push_subscriptions::{NewPushSubscription, PushSubscription};
pub use subscriptions::Subscription;
pub use users::{User, UserCredentials};

/// Thread-safe database handle wrapping a single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.configure()?;
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.configure()?;
        db.init_schema()?;
        Ok(db)
    }

    /// Access the underlying connection with a closure.
    pub fn with_conn<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&Connection) -> Result<R, DbError>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }

    fn configure(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA busy_timeout=5000;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
    }

    fn init_schema(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            schema::create_tables(conn)?;
            Ok(())
        })
    }
}

/// Database error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Credential encryption error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Extension trait for optional query results.
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
