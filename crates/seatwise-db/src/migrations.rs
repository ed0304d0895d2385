use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, events, reservations)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'user'
                                CHECK (role IN ('admin', 'user')),
                refresh_token   BLOB,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- confirmed_count is the capacity ledger: the sum of seats over
            -- confirmed reservations of this event.
            CREATE TABLE events (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                capacity        INTEGER NOT NULL CHECK (capacity > 0),
                confirmed_count INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (confirmed_count >= 0 AND confirmed_count <= capacity)
            );

            CREATE TABLE reservations (
                id              TEXT PRIMARY KEY,
                event_id        TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                seats           INTEGER NOT NULL CHECK (seats >= 1),
                status          TEXT NOT NULL DEFAULT 'confirmed'
                                CHECK (status IN ('confirmed', 'cancelled')),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_reservations_event
                ON reservations(event_id, status);

            CREATE INDEX idx_reservations_user
                ON reservations(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
