use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                sex         TEXT NOT NULL CHECK (sex IN ('Male', 'Female'))
            );

            -- Logical references: thought_id may point at a deleted thought.
            CREATE TABLE user_thoughts (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                thought_id  TEXT NOT NULL
            );

            CREATE INDEX idx_user_thoughts_user ON user_thoughts(user_id, seq);

            CREATE TABLE user_friends (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                friend_id   TEXT NOT NULL,
                UNIQUE (user_id, friend_id)
            );

            CREATE TABLE thoughts (
                id              TEXT PRIMARY KEY,
                thought_text    TEXT NOT NULL,
                username        TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE reactions (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                thought_id      TEXT NOT NULL REFERENCES thoughts(id) ON DELETE CASCADE,
                reaction_id     TEXT NOT NULL,
                reaction_body   TEXT NOT NULL,
                username        TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_reactions_thought ON reactions(thought_id, seq);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
