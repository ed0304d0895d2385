//! Login, refresh-token rotation, logout and request authorization.
//!
//! Each user has at most one live refresh token: its sealed form sits in
//! `users.refresh_token` and every login or refresh overwrites it. A refresh
//! token therefore works exactly once, and a new login ends any session the
//! user had elsewhere.

use std::sync::Arc;

use constant_time_eq::constant_time_eq;
use seatwise_crypto::Cipher;
use seatwise_db::Database;
use seatwise_types::api::TokenPair;
use seatwise_types::claims::{AccessClaims, Role};
use seatwise_types::models::User;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::convert;
use crate::error::{Error, Result};
use crate::password;
use crate::tokens::TokenService;

pub struct SessionManager {
    db: Arc<Database>,
    tokens: TokenService,
    cipher: Cipher,
}

impl SessionManager {
    pub fn new(db: Arc<Database>, config: &AuthConfig) -> Result<Self> {
        let cipher =
            Cipher::new(config.encryption_key()).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            db,
            tokens: TokenService::new(config),
            cipher,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an account. Username and email must both be unused.
    pub fn register(&self, username: &str, email: &str, password: &str, role: Role) -> Result<User> {
        if self.db.get_user_by_username(username)?.is_some() {
            return Err(Error::AlreadyExists("username"));
        }
        if self.db.get_user_by_email(email)?.is_some() {
            return Err(Error::AlreadyExists("email"));
        }

        let password_hash = password::hash_password(password)?;
        let user_id = Uuid::new_v4().to_string();
        let inserted = self
            .db
            .create_user(&user_id, username, email, &password_hash, role.as_str())?;
        if !inserted {
            // lost a race with a concurrent registration
            return Err(self.taken_field(username)?);
        }

        let row = self
            .db
            .get_user_by_id(&user_id)?
            .ok_or(Error::NotFound("user"))?;
        info!("Registered user {} ({}) as {}", username, user_id, role);
        convert::user(&row)
    }

    /// Verify credentials and start a new session, replacing any previous one.
    pub fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let user = self
            .db
            .get_user_by_username(username)?
            .ok_or(Error::NotFound("user"))?;

        if !password::verify_password(password, &user.password)? {
            warn!("Failed login for {}", username);
            return Err(Error::Unauthorized);
        }

        let user_id = convert::parse_uuid(&user.id, "user id")?;
        let role = convert::parse_role(&user.role)?;
        let pair = self.start_session(user_id, role)?;

        info!("{} ({}) logged in", username, user_id);
        Ok(pair)
    }

    /// Exchange a refresh token for a new access + refresh pair. The
    /// presented token must be the one currently stored for its user.
    pub fn refresh(&self, presented: &str) -> Result<TokenPair> {
        let claims = self.tokens.verify_refresh(presented)?;

        let user = self
            .db
            .get_user_by_id(&claims.sub.to_string())?
            .ok_or(Error::Unauthorized)?;

        let Some(sealed) = user.refresh_token.as_deref() else {
            warn!("Refresh for {} with no active session", user.id);
            return Err(Error::Unauthorized);
        };

        let stored = match self.cipher.decrypt(sealed) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Stored session for {} is unreadable, revoking: {}", user.id, e);
                self.db.set_refresh_token(&user.id, None)?;
                return Err(Error::Crypto(e));
            }
        };

        if !constant_time_eq(&stored, presented.as_bytes()) {
            warn!("Stale refresh token presented for {}", user.id);
            return Err(Error::Unauthorized);
        }

        let role = convert::parse_role(&user.role)?;
        let pair = self.start_session(claims.sub, role)?;

        info!("Rotated refresh token for {}", user.id);
        Ok(pair)
    }

    /// Revoke the user's refresh token. Idempotent.
    pub fn logout(&self, user_id: Uuid) -> Result<()> {
        let existed = self.db.set_refresh_token(&user_id.to_string(), None)?;
        info!("{} logged out (known user: {})", user_id, existed);
        Ok(())
    }

    /// Validate an access token for a protected operation.
    pub fn authorize(&self, access_token: &str) -> Result<AccessClaims> {
        self.tokens.verify_access(access_token)
    }

    fn taken_field(&self, username: &str) -> Result<Error> {
        let field = if self.db.get_user_by_username(username)?.is_some() {
            "username"
        } else {
            "email"
        };
        Ok(Error::AlreadyExists(field))
    }

    fn start_session(&self, user_id: Uuid, role: Role) -> Result<TokenPair> {
        let access = self.tokens.issue_access(user_id, role)?;
        let refresh = self.tokens.issue_refresh(user_id)?;

        let sealed = self.cipher.encrypt(refresh.as_bytes())?;
        if !self.db.set_refresh_token(&user_id.to_string(), Some(&sealed))? {
            return Err(Error::Unauthorized);
        }

        Ok(TokenPair::bearer(access, refresh))
    }
}
