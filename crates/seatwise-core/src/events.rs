use std::sync::Arc;

use seatwise_db::Database;
use seatwise_types::claims::AccessClaims;
use seatwise_types::models::Event;
use tracing::info;
use uuid::Uuid;

use crate::convert;
use crate::error::{Error, Result};

const MAX_TITLE_LEN: usize = 200;

/// Event publishing. Creating an event opens its capacity ledger at zero.
pub struct EventService {
    db: Arc<Database>,
}

impl EventService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, organizer: &AccessClaims, title: &str, capacity: u32) -> Result<Event> {
        let title = title.trim();
        if title.is_empty() || title.len() > MAX_TITLE_LEN {
            return Err(Error::Validation(format!(
                "title must be 1-{} characters",
                MAX_TITLE_LEN
            )));
        }
        if capacity == 0 {
            return Err(Error::Validation("capacity must be at least 1".into()));
        }

        let id = Uuid::new_v4();
        self.db.create_event(
            &id.to_string(),
            &organizer.sub.to_string(),
            title,
            i64::from(capacity),
        )?;
        info!("Event {} published by {} with capacity {}", id, organizer.sub, capacity);

        self.get(id)
    }

    pub fn get(&self, id: Uuid) -> Result<Event> {
        let row = self
            .db
            .get_event(&id.to_string())?
            .ok_or(Error::NotFound("event"))?;
        convert::event(row)
    }

    pub fn list(&self, limit: u32) -> Result<Vec<Event>> {
        self.db
            .list_events(limit)?
            .into_iter()
            .map(convert::event)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatwise_types::claims::{Role, TokenKind};

    fn organizer(db: &Database) -> AccessClaims {
        let id = Uuid::new_v4();
        db.create_user(&id.to_string(), "org", "org@example.com", "h", "user")
            .unwrap();
        AccessClaims { sub: id, role: Role::User, iat: 0, exp: 0, typ: TokenKind::Access }
    }

    #[test]
    fn create_then_get() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let org = organizer(&db);
        let events = EventService::new(db);

        let event = events.create(&org, "  Jazz Night ", 40).unwrap();
        assert_eq!(event.title, "Jazz Night");
        assert_eq!(event.owner_id, org.sub);
        assert_eq!(event.available(), 40);

        let fetched = events.get(event.id).unwrap();
        assert_eq!(fetched.capacity, 40);
        assert_eq!(events.list(10).unwrap().len(), 1);
    }

    #[test]
    fn invalid_events_rejected() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let org = organizer(&db);
        let events = EventService::new(db);

        assert!(matches!(events.create(&org, "Gig", 0), Err(Error::Validation(_))));
        assert!(matches!(events.create(&org, "   ", 5), Err(Error::Validation(_))));
        assert!(matches!(events.get(Uuid::new_v4()), Err(Error::NotFound("event"))));
    }
}
