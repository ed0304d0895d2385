use seatwise_crypto::CryptoError;
use seatwise_db::LedgerError;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the core reports. Storage-engine errors never escape as
/// such: they arrive here as `Internal`, or as one of the ledger outcomes.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing configuration. Only produced at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Stored refresh-token ciphertext could not be opened.
    #[error("stored session is unreadable: {0}")]
    Crypto(#[from] CryptoError),

    /// Bad signature, malformed token, wrong token type or expired.
    #[error("invalid or expired token")]
    TokenInvalid,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already taken")]
    AlreadyExists(&'static str),

    #[error("event is full: requested {requested} seat(s), {available} available")]
    CapacityExceeded { requested: u32, available: u32 },

    /// The store gave up waiting for the ledger lock. Safe to retry.
    #[error("ledger busy, retry later")]
    Conflict,

    #[error("{0}")]
    Validation(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl Error {
    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Crypto(_) => "crypto_error",
            Error::TokenInvalid => "token_invalid",
            Error::Unauthorized => "unauthorized",
            Error::Forbidden => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::AlreadyExists(_) => "already_exists",
            Error::CapacityExceeded { .. } => "capacity_exceeded",
            Error::Conflict => "conflict",
            Error::Validation(_) => "validation",
            Error::Internal(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        error!("Internal failure: {:#}", e);
        Error::Internal(e)
    }
}

impl From<LedgerError> for Error {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::EventNotFound => Error::NotFound("event"),
            LedgerError::ReservationNotFound => Error::NotFound("reservation"),
            LedgerError::ReservationCancelled => {
                Error::Validation("reservation is cancelled".into())
            }
            LedgerError::CapacityExceeded { requested, available } => Error::CapacityExceeded {
                requested: clamp_seats(requested),
                available: clamp_seats(available),
            },
            LedgerError::Busy => Error::Conflict,
            LedgerError::Storage(e) => anyhow::Error::new(e).into(),
            LedgerError::Other(e) => e.into(),
        }
    }
}

fn clamp_seats(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}
