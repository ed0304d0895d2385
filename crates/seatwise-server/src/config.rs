use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use seatwise_core::AuthConfig;
use seatwise_core::config::{DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_MINUTES};
use seatwise_crypto::keys::key_from_base64;

/// Everything the binary reads from the environment.
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
    pub admin_username: Option<String>,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("SEATWISE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(var("SEATWISE_PORT"), "SEATWISE_PORT", 3000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path: PathBuf = var("SEATWISE_DB_PATH")
            .unwrap_or_else(|| "seatwise.db".into())
            .into();
        let busy_ms: u64 = parse_or(var("SEATWISE_DB_BUSY_TIMEOUT_MS"), "SEATWISE_DB_BUSY_TIMEOUT_MS", 5000)?;

        let access_secret = var("SEATWISE_ACCESS_SECRET").unwrap_or_default();
        let refresh_secret = var("SEATWISE_REFRESH_SECRET").unwrap_or_default();
        let access_ttl: i64 = parse_or(
            var("SEATWISE_ACCESS_TTL_MINUTES"),
            "SEATWISE_ACCESS_TTL_MINUTES",
            DEFAULT_ACCESS_TTL_MINUTES,
        )?;
        let refresh_ttl: i64 = parse_or(
            var("SEATWISE_REFRESH_TTL_MINUTES"),
            "SEATWISE_REFRESH_TTL_MINUTES",
            DEFAULT_REFRESH_TTL_MINUTES,
        )?;

        let Some(encoded_key) = var("SEATWISE_ENCRYPTION_KEY") else {
            bail!("SEATWISE_ENCRYPTION_KEY is unset (expected base64 of 32 random bytes)");
        };
        let key = key_from_base64(encoded_key.trim()).context("SEATWISE_ENCRYPTION_KEY")?;

        let auth = AuthConfig::new(
            access_secret,
            refresh_secret,
            chrono::Duration::minutes(access_ttl),
            chrono::Duration::minutes(refresh_ttl),
            &key,
        )?;

        Ok(Self {
            addr,
            db_path,
            busy_timeout: Duration::from_millis(busy_ms),
            admin_username: var("SEATWISE_ADMIN_USERNAME"),
            auth,
        })
    }
}

fn parse_or<T>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} is not a valid number: {:?}", name, v)),
        None => Ok(default),
    }
}
