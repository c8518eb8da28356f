//! Bearer tokens.
//!
//! Tokens are HS256 JWTs whose subject is the user id. Nothing is kept
//! server-side: a token is valid until it expires.

use chrono::{DateTime, Duration, Utc};
use engine::User;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::ServerError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl AuthManager {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Signs a token for `user`, returning it with its expiry.
    pub fn issue(&self, user: &User) -> Result<(String, DateTime<Utc>), ServerError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |err| {
                tracing::error!("failed to sign token: {err}");
                ServerError::Generic("cannot issue token".to_string())
            },
        )?;
        Ok((token, expires_at))
    }

    /// Decodes and checks a token. `None` for anything not acceptable.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let auth = AuthManager::new("secret", Duration::hours(1));
        let user = user();
        let (token, expires_at) = auth.issue(&user).unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let issuer = AuthManager::new("secret", Duration::hours(1));
        let other = AuthManager::new("another", Duration::hours(1));
        let (token, _) = issuer.issue(&user()).unwrap();
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = AuthManager::new("secret", Duration::hours(-1));
        let (token, _) = auth.issue(&user()).unwrap();
        assert!(auth.verify(&token).is_none());
        assert!(auth.verify("not-a-token").is_none());
    }
}
