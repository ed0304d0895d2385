//! Reservation admission control.
//!
//! The confirmed seats of an event never exceed its capacity. Every change
//! goes through one ledger transaction in `seatwise-db`; this layer adds
//! ownership checks, input validation and the mapping to typed errors.
//! Nothing here retries: a `Conflict` goes back to the caller.

use std::sync::Arc;

use seatwise_db::{Database, LedgerSnapshot};
use seatwise_db::models::ReservationRow;
use seatwise_types::claims::AccessClaims;
use seatwise_types::models::Reservation;
use tracing::{info, warn};
use uuid::Uuid;

use crate::convert;
use crate::error::{Error, Result};

pub struct AdmissionController {
    db: Arc<Database>,
}

impl AdmissionController {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Book `seats` on `event_id` for the caller.
    pub fn create(&self, actor: &AccessClaims, event_id: Uuid, seats: u32) -> Result<Reservation> {
        check_seats(seats)?;

        let reservation_id = Uuid::new_v4();
        let row = self
            .db
            .reserve_seats(
                &reservation_id.to_string(),
                &event_id.to_string(),
                &actor.sub.to_string(),
                i64::from(seats),
            )
            .map_err(Error::from)
            .inspect_err(|e| log_rejection("create", event_id, actor.sub, e))?;

        info!(
            "Reservation {} confirmed: {} seat(s) on event {} for {}",
            reservation_id, seats, event_id, actor.sub
        );
        convert::reservation(row)
    }

    /// Cancel a reservation and give its seats back to the event.
    pub fn cancel(&self, actor: &AccessClaims, reservation_id: Uuid) -> Result<Reservation> {
        let existing = self.owned(actor, reservation_id)?;

        let row = self
            .db
            .cancel_reservation(&existing.id)
            .map_err(Error::from)
            .inspect_err(|e| log_rejection("cancel", reservation_id, actor.sub, e))?;

        info!(
            "Reservation {} cancelled by {}, {} seat(s) released on event {}",
            reservation_id, actor.sub, row.seats, row.event_id
        );
        convert::reservation(row)
    }

    /// Change the seat count of a confirmed reservation.
    pub fn update(&self, actor: &AccessClaims, reservation_id: Uuid, new_seats: u32) -> Result<Reservation> {
        check_seats(new_seats)?;
        let existing = self.owned(actor, reservation_id)?;

        let row = self
            .db
            .resize_reservation(&existing.id, i64::from(new_seats))
            .map_err(Error::from)
            .inspect_err(|e| log_rejection("update", reservation_id, actor.sub, e))?;

        info!(
            "Reservation {} resized from {} to {} seat(s) by {}",
            reservation_id, existing.seats, new_seats, actor.sub
        );
        convert::reservation(row)
    }

    pub fn get(&self, actor: &AccessClaims, reservation_id: Uuid) -> Result<Reservation> {
        convert::reservation(self.owned(actor, reservation_id)?)
    }

    /// The caller's reservations, newest first. Admins see everyone's.
    pub fn list(&self, actor: &AccessClaims) -> Result<Vec<Reservation>> {
        let owner = (!actor.is_admin()).then(|| actor.sub.to_string());
        self.db
            .list_reservations(owner.as_deref())?
            .into_iter()
            .map(convert::reservation)
            .collect()
    }

    /// Ledger counter next to the recomputed sum of confirmed seats.
    pub fn audit(&self, event_id: Uuid) -> Result<LedgerSnapshot> {
        self.db
            .ledger_snapshot(&event_id.to_string())?
            .ok_or(Error::NotFound("event"))
    }

    /// Load a reservation the actor is allowed to act on. Ownership never
    /// changes, so checking it outside the ledger transaction is safe.
    fn owned(&self, actor: &AccessClaims, reservation_id: Uuid) -> Result<ReservationRow> {
        let row = self
            .db
            .get_reservation(&reservation_id.to_string())?
            .ok_or(Error::NotFound("reservation"))?;

        let owner = convert::parse_uuid(&row.user_id, "reservation user id")?;
        if !actor.can_act_for(owner) {
            warn!("{} denied access to reservation {}", actor.sub, reservation_id);
            return Err(Error::Forbidden);
        }
        Ok(row)
    }
}

fn check_seats(seats: u32) -> Result<()> {
    if seats == 0 {
        return Err(Error::Validation("seats must be at least 1".into()));
    }
    Ok(())
}

fn log_rejection(op: &str, target: Uuid, actor: Uuid, e: &Error) {
    match e {
        Error::CapacityExceeded { requested, available } => warn!(
            "{} on {} by {} rejected: {} seat(s) requested, {} available",
            op, target, actor, requested, available
        ),
        Error::Conflict => warn!("{} on {} by {} aborted: ledger busy", op, target, actor),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatwise_types::claims::{Role, TokenKind};
    use seatwise_types::models::ReservationStatus;

    struct Fixture {
        db: Arc<Database>,
        desk: AdmissionController,
        event: Uuid,
    }

    fn fixture(capacity: i64) -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let owner = user(&db, Role::User);
        let event = Uuid::new_v4();
        db.create_event(&event.to_string(), &owner.sub.to_string(), "Show", capacity)
            .unwrap();
        Fixture { desk: AdmissionController::new(db.clone()), db, event }
    }

    fn user(db: &Database, role: Role) -> AccessClaims {
        let id = Uuid::new_v4();
        db.create_user(
            &id.to_string(),
            &format!("u-{}", id),
            &format!("{}@example.com", id),
            "h",
            role.as_str(),
        )
        .unwrap();
        AccessClaims { sub: id, role, iat: 0, exp: 0, typ: TokenKind::Access }
    }

    fn confirmed(f: &Fixture) -> i64 {
        let snap = f.desk.audit(f.event).unwrap();
        assert!(snap.is_consistent(), "{:?}", snap);
        snap.confirmed_count
    }

    #[test]
    fn capacity_two_admits_two_of_three() {
        let f = fixture(2);
        let users: Vec<_> = (0..3).map(|_| user(&f.db, Role::User)).collect();

        f.desk.create(&users[0], f.event, 1).unwrap();
        f.desk.create(&users[1], f.event, 1).unwrap();
        let err = f.desk.create(&users[2], f.event, 1).unwrap_err();

        assert!(matches!(err, Error::CapacityExceeded { requested: 1, available: 0 }));
        assert_eq!(confirmed(&f), 2);
        assert!(f.desk.list(&users[2]).unwrap().is_empty());
    }

    #[test]
    fn cancellation_reopens_a_seat() {
        let f = fixture(2);
        let users: Vec<_> = (0..3).map(|_| user(&f.db, Role::User)).collect();

        let first = f.desk.create(&users[0], f.event, 1).unwrap();
        f.desk.create(&users[1], f.event, 1).unwrap();

        let cancelled = f.desk.cancel(&users[0], first.id).unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(confirmed(&f), 1);

        f.desk.create(&users[2], f.event, 1).unwrap();
        assert_eq!(confirmed(&f), 2);
    }

    #[test]
    fn update_revalidates_capacity() {
        let f = fixture(4);
        let alice = user(&f.db, Role::User);
        let bob = user(&f.db, Role::User);

        let r = f.desk.create(&alice, f.event, 2).unwrap();
        f.desk.create(&bob, f.event, 1).unwrap();

        assert_eq!(f.desk.update(&alice, r.id, 3).unwrap().seats, 3);
        assert!(matches!(
            f.desk.update(&alice, r.id, 4),
            Err(Error::CapacityExceeded { requested: 4, available: 3 })
        ));
        assert_eq!(confirmed(&f), 4);

        assert_eq!(f.desk.update(&alice, r.id, 1).unwrap().seats, 1);
        assert_eq!(confirmed(&f), 2);
    }

    #[test]
    fn ownership_is_enforced_except_for_admins() {
        let f = fixture(5);
        let alice = user(&f.db, Role::User);
        let mallory = user(&f.db, Role::User);
        let admin = user(&f.db, Role::Admin);

        let r = f.desk.create(&alice, f.event, 2).unwrap();

        assert!(matches!(f.desk.get(&mallory, r.id), Err(Error::Forbidden)));
        assert!(matches!(f.desk.update(&mallory, r.id, 1), Err(Error::Forbidden)));
        assert!(matches!(f.desk.cancel(&mallory, r.id), Err(Error::Forbidden)));
        assert_eq!(confirmed(&f), 2);

        assert!(f.desk.list(&mallory).unwrap().is_empty());
        assert_eq!(f.desk.list(&admin).unwrap().len(), 1);
        assert_eq!(f.desk.get(&admin, r.id).unwrap().user_id, alice.sub);
        f.desk.cancel(&admin, r.id).unwrap();
        assert_eq!(confirmed(&f), 0);
    }

    #[test]
    fn invalid_requests_change_nothing() {
        let f = fixture(5);
        let alice = user(&f.db, Role::User);

        assert!(matches!(f.desk.create(&alice, f.event, 0), Err(Error::Validation(_))));
        assert!(matches!(f.desk.create(&alice, Uuid::new_v4(), 1), Err(Error::NotFound("event"))));
        assert!(matches!(f.desk.cancel(&alice, Uuid::new_v4()), Err(Error::NotFound("reservation"))));

        let r = f.desk.create(&alice, f.event, 2).unwrap();
        assert!(matches!(f.desk.update(&alice, r.id, 0), Err(Error::Validation(_))));
        assert!(matches!(f.desk.create(&alice, f.event, 4), Err(Error::CapacityExceeded { .. })));

        f.desk.cancel(&alice, r.id).unwrap();
        assert!(matches!(f.desk.update(&alice, r.id, 1), Err(Error::Validation(_))));
        assert_eq!(confirmed(&f), 0);
    }

    #[test]
    fn concurrent_single_seat_requests_admit_exactly_capacity() {
        const CAPACITY: i64 = 5;
        const REQUESTS: usize = 32;

        let f = fixture(CAPACITY);
        let desk = Arc::new(f.desk);
        let users: Vec<_> = (0..REQUESTS).map(|_| user(&f.db, Role::User)).collect();

        let outcomes: Vec<Result<Reservation>> = std::thread::scope(|scope| {
            let handles: Vec<_> = users
                .iter()
                .map(|u| {
                    let desk = desk.clone();
                    let event = f.event;
                    scope.spawn(move || desk.create(u, event, 1))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let admitted = outcomes.iter().filter(|o| o.is_ok()).count();
        let full = outcomes
            .iter()
            .filter(|o| matches!(o, Err(Error::CapacityExceeded { .. })))
            .count();

        assert_eq!(admitted, CAPACITY as usize);
        assert_eq!(full, REQUESTS - CAPACITY as usize);

        let snap = desk.audit(f.event).unwrap();
        assert!(snap.is_consistent());
        assert_eq!(snap.confirmed_count, CAPACITY);
    }
}
