//! Row → model conversion. A row that does not parse means the database
//! holds something this code never wrote, which is an internal error.

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use seatwise_db::models::{EventRow, ReservationRow, UserRow};
use seatwise_types::claims::Role;
use seatwise_types::models::{Event, Reservation, ReservationStatus, User};
use uuid::Uuid;

use crate::error::Result;

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Result<Uuid> {
    Ok(raw
        .parse::<Uuid>()
        .with_context(|| format!("corrupt {} '{}'", what, raw))?)
}

pub(crate) fn parse_role(raw: &str) -> Result<Role> {
    Ok(raw.parse::<Role>().map_err(|e| anyhow!(e))?)
}

/// SQLite `datetime('now')` yields "YYYY-MM-DD HH:MM:SS" without a zone;
/// those are UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = raw.parse::<DateTime<Utc>>().or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    });
    Ok(parsed.with_context(|| format!("corrupt timestamp '{}'", raw))?)
}

fn to_u32(value: i64, what: &str) -> Result<u32> {
    Ok(u32::try_from(value).with_context(|| format!("{} out of range: {}", what, value))?)
}

pub(crate) fn user(row: &UserRow) -> Result<User> {
    Ok(User {
        id: parse_uuid(&row.id, "user id")?,
        username: row.username.clone(),
        email: row.email.clone(),
        role: parse_role(&row.role)?,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

pub(crate) fn event(row: EventRow) -> Result<Event> {
    Ok(Event {
        id: parse_uuid(&row.id, "event id")?,
        owner_id: parse_uuid(&row.owner_id, "event owner id")?,
        capacity: to_u32(row.capacity, "capacity")?,
        confirmed_count: to_u32(row.confirmed_count, "confirmed_count")?,
        created_at: parse_timestamp(&row.created_at)?,
        title: row.title,
    })
}

pub(crate) fn reservation(row: ReservationRow) -> Result<Reservation> {
    Ok(Reservation {
        id: parse_uuid(&row.id, "reservation id")?,
        event_id: parse_uuid(&row.event_id, "reservation event id")?,
        user_id: parse_uuid(&row.user_id, "reservation user id")?,
        seats: to_u32(row.seats, "seats")?,
        status: row
            .status
            .parse::<ReservationStatus>()
            .map_err(|e| anyhow!(e))?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_and_rfc3339_timestamps_parse() {
        let a = parse_timestamp("2026-03-01 18:30:00").unwrap();
        let b = parse_timestamp("2026-03-01T18:30:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn bad_uuid_is_internal() {
        assert!(matches!(parse_uuid("x", "user id"), Err(crate::Error::Internal(_))));
    }
}
