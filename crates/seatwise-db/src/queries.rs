use crate::Database;
use crate::models::{EventRow, ReservationRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, username, email, password, role, refresh_token, created_at";
const EVENT_COLUMNS: &str = "id, owner_id, title, capacity, confirmed_count, created_at";
pub(crate) const RESERVATION_COLUMNS: &str =
    "id, event_id, user_id, seats, status, created_at, updated_at";

impl Database {
    // -- Users --

    /// Insert a user. Returns false when the username or email is already
    /// taken, which the UNIQUE constraints decide at insert time.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            match conn.execute(
                "INSERT INTO users (id, username, email, password, role) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, email, password_hash, role),
            ) {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Overwrite (or clear, with `None`) the user's sealed refresh token.
    /// Returns false when no such user exists.
    pub fn set_refresh_token(&self, user_id: &str, sealed: Option<&[u8]>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET refresh_token = ?2 WHERE id = ?1",
                rusqlite::params![user_id, sealed],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Events --

    pub fn create_event(&self, id: &str, owner_id: &str, title: &str, capacity: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO events (id, owner_id, title, capacity) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, owner_id, title, capacity],
            )?;
            Ok(())
        })
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS);
            conn.query_row(&sql, [id], event_from_row).optional()
        })
    }

    pub fn list_events(&self, limit: u32) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM events ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                EVENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], event_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reservations --

    pub fn get_reservation(&self, id: &str) -> Result<Option<ReservationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM reservations WHERE id = ?1", RESERVATION_COLUMNS);
            conn.query_row(&sql, [id], reservation_from_row).optional()
        })
    }

    /// Reservations of one user, newest first. `None` lists every user's.
    pub fn list_reservations(&self, user_id: Option<&str>) -> Result<Vec<ReservationRow>> {
        self.with_conn(|conn| {
            let rows = match user_id {
                Some(uid) => {
                    let sql = format!(
                        "SELECT {} FROM reservations WHERE user_id = ?1
                         ORDER BY created_at DESC, rowid DESC",
                        RESERVATION_COLUMNS
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt
                        .query_map([uid], reservation_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let sql = format!(
                        "SELECT {} FROM reservations ORDER BY created_at DESC, rowid DESC",
                        RESERVATION_COLUMNS
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt
                        .query_map([], reservation_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                refresh_token: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        capacity: row.get(3)?,
        confirmed_count: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(crate) fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<ReservationRow> {
    Ok(ReservationRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        user_id: row.get(2)?,
        seats: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

trait OptionalExt<T> {
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
