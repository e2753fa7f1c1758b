use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, capsules)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Timestamps are fixed-width RFC 3339 UTC so text order is time order.
            CREATE TABLE capsules (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                open_at     TEXT NOT NULL,
                is_opened   INTEGER NOT NULL DEFAULT 0,
                opened_at   TEXT,
                CHECK ((is_opened = 0) = (opened_at IS NULL))
            );

            CREATE INDEX idx_capsules_created
                ON capsules(created_at);

            CREATE INDEX idx_capsules_owner
                ON capsules(owner_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
