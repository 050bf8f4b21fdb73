//! Access token issuance and verification.
//!
//! The rest of the crate only sees `issue_token(user_id)` and `verify(token)`;
//! the signing algorithm and secret are deployment configuration.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is invalid or expired: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token subject is not a user id")]
    BadSubject,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string per RFC 7519.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Signing material for access tokens, shared with handlers through `web::Data`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn new(secret: &[u8], lifetime_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::minutes(lifetime_minutes),
        }
    }

    /// Builds keys from the `auth` config section. An empty secret is replaced
    /// with a random one, which invalidates tokens on every restart.
    pub fn from_config(config: &crate::app_config::AuthConfig) -> Self {
        if config.jwt_secret.is_empty() {
            let random_secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect();
            Self::new(random_secret.as_bytes(), config.token_lifetime_minutes)
        } else {
            Self::new(config.jwt_secret.as_bytes(), config.token_lifetime_minutes)
        }
    }

    /// Issues a signed access token bound to the user id.
    pub fn issue_token(&self, user_id: i32) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Returns the user id a valid token was issued for.
    pub fn verify(&self, token: &str) -> Result<i32, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        data.claims
            .sub
            .parse::<i32>()
            .map_err(|_| TokenError::BadSubject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_verifies() {
        let keys = TokenKeys::new(b"test-secret", 60);
        let token = keys.issue_token(42).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), 42);
    }

    #[test]
    fn test_foreign_token_rejected() {
        let ours = TokenKeys::new(b"test-secret", 60);
        let theirs = TokenKeys::new(b"another-secret", 60);
        let token = theirs.issue_token(42).unwrap();
        assert!(ours.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Beyond the default 60s leeway.
        let keys = TokenKeys::new(b"test-secret", -10);
        let token = keys.issue_token(42).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let keys = TokenKeys::new(b"test-secret", 60);
        assert!(keys.verify("not.a.token").is_err());
    }
}
