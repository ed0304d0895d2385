pub mod auth;
pub mod error;
pub mod events;
pub mod middleware;
pub mod reservations;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
