use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use seatwise_types::claims::{AccessClaims, RefreshClaims, Role, TokenKind};
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// Issues and verifies HS256 JWTs. Access and refresh tokens are signed with
/// different secrets, so neither can be verified as the other.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expired means expired: no grace window
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret()),
            access_decoding: DecodingKey::from_secret(config.access_secret()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret()),
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
            validation,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue_access(&self, user_id: Uuid, role: Role) -> Result<String> {
        self.issue_access_at(user_id, role, Utc::now())
    }

    /// Issue an access token as if the current time were `now`.
    pub fn issue_access_at(&self, user_id: Uuid, role: Role, now: DateTime<Utc>) -> Result<String> {
        let claims = AccessClaims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            typ: TokenKind::Access,
        };
        sign(&claims, &self.access_encoding)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String> {
        self.issue_refresh_at(user_id, Utc::now())
    }

    pub fn issue_refresh_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            typ: TokenKind::Refresh,
        };
        sign(&claims, &self.refresh_encoding)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.access_decoding, &self.validation)
            .map_err(|e| {
                debug!("Access token rejected: {}", e);
                Error::TokenInvalid
            })?;

        if data.claims.typ != TokenKind::Access {
            debug!("Access token rejected: typ is {:?}", data.claims.typ);
            return Err(Error::TokenInvalid);
        }
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map_err(|e| {
                debug!("Refresh token rejected: {}", e);
                Error::TokenInvalid
            })?;

        if data.claims.typ != TokenKind::Refresh {
            debug!("Refresh token rejected: typ is {:?}", data.claims.typ);
            return Err(Error::TokenInvalid);
        }
        Ok(data.claims)
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| Error::Internal(anyhow::anyhow!("token signing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    fn service() -> TokenService {
        TokenService::new(&test_config())
    }

    #[test]
    fn access_roundtrip_carries_subject_and_role() {
        let tokens = service();
        let user = Uuid::new_v4();

        let token = tokens.issue_access(user, Role::Admin).unwrap();
        let claims = tokens.verify_access(&token).unwrap();

        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn refresh_tokens_are_unique_per_issue() {
        let tokens = service();
        let user = Uuid::new_v4();
        let now = Utc::now();

        let a = tokens.issue_refresh_at(user, now).unwrap();
        let b = tokens.issue_refresh_at(user, now).unwrap();
        assert_ne!(a, b);

        let claims = tokens.verify_refresh(&a).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn expired_one_second_ago_is_rejected() {
        let tokens = service();
        let issued = Utc::now() - tokens.access_ttl() - Duration::seconds(1);

        let token = tokens.issue_access_at(Uuid::new_v4(), Role::User, issued).unwrap();
        assert!(matches!(tokens.verify_access(&token), Err(Error::TokenInvalid)));
    }

    #[test]
    fn expired_refresh_is_rejected() {
        let tokens = service();
        let issued = Utc::now() - Duration::days(8);

        let token = tokens.issue_refresh_at(Uuid::new_v4(), issued).unwrap();
        assert!(matches!(tokens.verify_refresh(&token), Err(Error::TokenInvalid)));
    }

    #[test]
    fn tokens_do_not_cross_verify() {
        let tokens = service();
        let user = Uuid::new_v4();

        let access = tokens.issue_access(user, Role::User).unwrap();
        let refresh = tokens.issue_refresh(user).unwrap();

        assert!(matches!(tokens.verify_refresh(&access), Err(Error::TokenInvalid)));
        assert!(matches!(tokens.verify_access(&refresh), Err(Error::TokenInvalid)));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let tokens = service();
        let token = tokens.issue_access(Uuid::new_v4(), Role::User).unwrap();

        // flip one character of the signature
        let mut tampered = token.clone().into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(matches!(tokens.verify_access(&tampered), Err(Error::TokenInvalid)));

        let other = AuthConfig::new(
            "some-other-access",
            "some-other-refresh",
            Duration::minutes(30),
            Duration::days(7),
            &[0x11; seatwise_crypto::KEY_LEN],
        )
        .unwrap();
        let foreign = TokenService::new(&other)
            .issue_access(Uuid::new_v4(), Role::Admin)
            .unwrap();
        assert!(matches!(tokens.verify_access(&foreign), Err(Error::TokenInvalid)));

        assert!(matches!(tokens.verify_access("not.a.jwt"), Err(Error::TokenInvalid)));
        assert!(matches!(tokens.verify_access(""), Err(Error::TokenInvalid)));
    }
}
