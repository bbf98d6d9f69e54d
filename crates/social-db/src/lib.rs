pub mod migrations;
pub mod models;
mod thoughts;
mod users;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("E11000 duplicate key error collection: users index: {field}_1 dup key: {{ {field}: \"{value}\" }}")]
    Duplicate { field: String, value: String },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The single process-wide store connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the store named by a connection string: a file path, `:memory:`,
    /// or either of those behind a `sqlite://` prefix.
    pub fn connect(url: &str) -> Result<Self> {
        let target = url.strip_prefix("sqlite://").unwrap_or(url);
        let opened = if target == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(Path::new(target))
        };

        match opened.map_err(StoreError::from).and_then(Self::init) {
            Ok(db) => {
                info!("Database connected at {}", target);
                Ok(db)
            }
            Err(e) => {
                error!("Database connection to {} failed: {}", target, e);
                Err(e)
            }
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL mode for concurrent reads; in-memory stores report "memory"
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("journal_mode = {}", mode);
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_accepts_memory_urls() {
        assert!(Database::connect(":memory:").is_ok());
        assert!(Database::connect("sqlite://:memory:").is_ok());
    }

    #[test]
    fn connect_fails_for_unreachable_path() {
        let err = Database::connect("/definitely/not/a/dir/social.db");
        assert!(matches!(err, Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn migrations_are_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| migrations::run(conn)).unwrap();

        let version: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(version, 1);
    }
}
