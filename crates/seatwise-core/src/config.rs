use std::fmt;

use chrono::Duration;
use seatwise_crypto::{CryptoError, KEY_LEN};

use crate::error::{Error, Result};

pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

/// Immutable auth configuration, validated once at construction.
#[derive(Clone)]
pub struct AuthConfig {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    encryption_key: [u8; KEY_LEN],
}

impl AuthConfig {
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        encryption_key: &[u8],
    ) -> Result<Self> {
        let access_secret = access_secret.into();
        let refresh_secret = refresh_secret.into();

        check_secret("access", &access_secret)?;
        check_secret("refresh", &refresh_secret)?;
        if access_secret == refresh_secret {
            return Err(Error::Config(
                "access and refresh token secrets must differ".into(),
            ));
        }

        if access_ttl <= Duration::zero() {
            return Err(Error::Config("access token TTL must be positive".into()));
        }
        if refresh_ttl <= Duration::zero() {
            return Err(Error::Config("refresh token TTL must be positive".into()));
        }

        let encryption_key: [u8; KEY_LEN] = encryption_key.try_into().map_err(|_| {
            Error::Config(
                CryptoError::InvalidKeyLength {
                    expected: KEY_LEN,
                    actual: encryption_key.len(),
                }
                .to_string(),
            )
        })?;

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
            encryption_key,
        })
    }

    pub fn access_secret(&self) -> &[u8] {
        self.access_secret.as_bytes()
    }

    pub fn refresh_secret(&self) -> &[u8] {
        self.refresh_secret.as_bytes()
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn encryption_key(&self) -> &[u8; KEY_LEN] {
        &self.encryption_key
    }
}

fn check_secret(which: &str, secret: &str) -> Result<()> {
    if secret.trim().is_empty() {
        return Err(Error::Config(format!("{} token secret is empty", which)));
    }
    if PLACEHOLDER_SECRETS.contains(&secret) {
        return Err(Error::Config(format!(
            "{} token secret is still a placeholder",
            which
        )));
    }
    Ok(())
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}
