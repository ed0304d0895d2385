//! Event capacity ledger.
//!
//! `events.confirmed_count` tracks the seats held by confirmed reservations.
//! Every mutation runs in a `BEGIN IMMEDIATE` transaction and moves the
//! counter with one conditional `UPDATE`, so the capacity check and the
//! write are a single statement and concurrent writers are serialized by
//! SQLite itself.

use anyhow::anyhow;
use rusqlite::{ErrorCode, OptionalExtension, Transaction, TransactionBehavior};
use thiserror::Error;
use tracing::debug;

use crate::Database;
use crate::models::{ReservationRow, STATUS_CANCELLED, STATUS_CONFIRMED};
use crate::queries::{RESERVATION_COLUMNS, reservation_from_row};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("event not found")]
    EventNotFound,

    #[error("reservation not found")]
    ReservationNotFound,

    #[error("reservation is cancelled")]
    ReservationCancelled,

    #[error("not enough seats: requested {requested}, available {available}")]
    CapacityExceeded { requested: i64, available: i64 },

    /// Another connection held the write lock past the busy timeout.
    /// The transaction was rolled back; the caller may retry.
    #[error("ledger is busy")]
    Busy,

    #[error("storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => LedgerError::Busy,
            _ => LedgerError::Storage(e),
        }
    }
}

/// Point-in-time view of one event's ledger, used for audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub capacity: i64,
    pub confirmed_count: i64,
    /// Sum of seats over confirmed reservations, recomputed from the rows.
    pub confirmed_seats: i64,
}

impl LedgerSnapshot {
    pub fn is_consistent(&self) -> bool {
        self.confirmed_count == self.confirmed_seats
            && self.confirmed_count >= 0
            && self.confirmed_count <= self.capacity
    }
}

impl Database {
    /// Take `seats` from the event's ledger and insert a confirmed
    /// reservation, atomically.
    pub fn reserve_seats(
        &self,
        reservation_id: &str,
        event_id: &str,
        user_id: &str,
        seats: i64,
    ) -> Result<ReservationRow, LedgerError> {
        self.transact(|tx| {
            adjust_confirmed(tx, event_id, seats)?;
            tx.execute(
                "INSERT INTO reservations (id, event_id, user_id, seats, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![reservation_id, event_id, user_id, seats, STATUS_CONFIRMED],
            )?;
            load_reservation(tx, reservation_id)
        })
    }

    /// Mark a reservation cancelled and return its seats to the ledger.
    /// Cancelling an already-cancelled reservation changes nothing.
    pub fn cancel_reservation(&self, reservation_id: &str) -> Result<ReservationRow, LedgerError> {
        self.transact(|tx| {
            let row = load_reservation(tx, reservation_id)?;
            if row.status == STATUS_CANCELLED {
                debug!("Reservation {} already cancelled", reservation_id);
                return Ok(row);
            }

            adjust_confirmed(tx, &row.event_id, -row.seats)?;
            tx.execute(
                "UPDATE reservations SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![reservation_id, STATUS_CANCELLED],
            )?;
            load_reservation(tx, reservation_id)
        })
    }

    /// Change the seat count of a confirmed reservation. Releasing the old
    /// seats and taking the new ones is one ledger delta.
    pub fn resize_reservation(
        &self,
        reservation_id: &str,
        new_seats: i64,
    ) -> Result<ReservationRow, LedgerError> {
        self.transact(|tx| {
            let row = load_reservation(tx, reservation_id)?;
            if row.status != STATUS_CONFIRMED {
                return Err(LedgerError::ReservationCancelled);
            }

            let delta = new_seats - row.seats;
            if delta == 0 {
                return Ok(row);
            }

            // report the resize in whole-reservation terms, not as a delta
            adjust_confirmed(tx, &row.event_id, delta).map_err(|e| match e {
                LedgerError::CapacityExceeded { available, .. } => LedgerError::CapacityExceeded {
                    requested: new_seats,
                    available: available + row.seats,
                },
                other => other,
            })?;
            tx.execute(
                "UPDATE reservations SET seats = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![reservation_id, new_seats],
            )?;
            load_reservation(tx, reservation_id)
        })
    }

    pub fn ledger_snapshot(&self, event_id: &str) -> anyhow::Result<Option<LedgerSnapshot>> {
        self.with_conn(|conn| {
            let snapshot = conn
                .query_row(
                    "SELECT e.capacity, e.confirmed_count,
                            COALESCE((SELECT SUM(r.seats) FROM reservations r
                                      WHERE r.event_id = e.id AND r.status = ?2), 0)
                     FROM events e WHERE e.id = ?1",
                    rusqlite::params![event_id, STATUS_CONFIRMED],
                    |row| {
                        Ok(LedgerSnapshot {
                            capacity: row.get(0)?,
                            confirmed_count: row.get(1)?,
                            confirmed_seats: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(snapshot)
        })
    }

    /// Run `f` inside an immediate transaction on the writer. Any error
    /// drops the transaction, which rolls it back.
    fn transact<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, LedgerError>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| anyhow!("Writer lock poisoned: {}", e))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Move the event's confirmed count by `delta` only if the result stays
/// within `0..=capacity`.
fn adjust_confirmed(tx: &Transaction<'_>, event_id: &str, delta: i64) -> Result<(), LedgerError> {
    let changed = tx.execute(
        "UPDATE events SET confirmed_count = confirmed_count + ?2
         WHERE id = ?1
           AND confirmed_count + ?2 <= capacity
           AND confirmed_count + ?2 >= 0",
        rusqlite::params![event_id, delta],
    )?;
    if changed == 1 {
        return Ok(());
    }

    let ledger: Option<(i64, i64)> = tx
        .query_row(
            "SELECT capacity, confirmed_count FROM events WHERE id = ?1",
            [event_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    match ledger {
        None => Err(LedgerError::EventNotFound),
        Some((capacity, confirmed)) if delta > 0 => Err(LedgerError::CapacityExceeded {
            requested: delta,
            available: capacity - confirmed,
        }),
        Some((_, confirmed)) => Err(anyhow!(
            "ledger underflow on event {}: confirmed {} cannot release {}",
            event_id,
            confirmed,
            -delta
        )
        .into()),
    }
}

fn load_reservation(tx: &Transaction<'_>, id: &str) -> Result<ReservationRow, LedgerError> {
    let sql = format!("SELECT {} FROM reservations WHERE id = ?1", RESERVATION_COLUMNS);
    tx.query_row(&sql, [id], reservation_from_row)
        .optional()?
        .ok_or(LedgerError::ReservationNotFound)
}
