/// Database row types. These map directly to SQLite rows.
/// Distinct from seatwise-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    /// Sealed refresh token (`nonce || ciphertext`), `None` when logged out.
    pub refresh_token: Option<Vec<u8>>,
    pub created_at: String,
}

pub struct EventRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub capacity: i64,
    pub confirmed_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ReservationRow {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub seats: i64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";
