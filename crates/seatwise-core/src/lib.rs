//! Seatwise core: token lifecycle and reservation admission control.
//!
//! Everything here is synchronous and talks to SQLite directly; async
//! callers run these operations on the blocking pool.

pub mod config;
mod convert;
pub mod error;
pub mod events;
pub mod password;
pub mod reservations;
pub mod sessions;
pub mod tokens;

pub use config::AuthConfig;
pub use error::{Error, Result};
pub use events::EventService;
pub use reservations::AdmissionController;
pub use sessions::SessionManager;
pub use tokens::TokenService;
