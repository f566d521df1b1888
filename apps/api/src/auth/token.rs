//! Signed session tokens (HS256 JWT).
//!
//! A token embeds the user id, email and a fixed 7-day expiry. Signature and
//! expiry are checked here without touching the database; the session row
//! check lives in `SessionService`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of every issued token, and of the matching cookie.
pub const TOKEN_TTL_DAYS: i64 = 7;

pub fn token_ttl() -> Duration {
    Duration::days(TOKEN_TTL_DAYS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    /// Random per-token id; keeps two tokens issued in the same second distinct.
    pub jti: Uuid,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly signed token and the expiry it embeds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue_at(user_id, email, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let expires_at = now + token_ttl();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Checks signature and embedded expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Ok(decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret-that-is-long-enough-for-hmac")
    }

    #[test]
    fn test_issue_and_verify() {
        let user_id = Uuid::new_v4();
        let issued = signer().issue(user_id, "a@b.com").unwrap();

        let claims = signer().verify(&issued.token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_DAYS * 24 * 60 * 60);
        assert_eq!(claims.expires_at(), issued.expires_at);
    }

    #[test]
    fn test_expired_token_fails() {
        let issued = signer()
            .issue_at(Uuid::new_v4(), "a@b.com", Utc::now() - Duration::days(8))
            .unwrap();
        assert!(signer().verify(&issued.token).is_err());
    }

    #[test]
    fn test_different_secret_fails() {
        let issued = signer().issue(Uuid::new_v4(), "a@b.com").unwrap();
        let other = TokenSigner::new("another-secret");
        assert!(other.verify(&issued.token).is_err());
    }

    #[test]
    fn test_tampered_token_fails() {
        let issued = signer().issue(Uuid::new_v4(), "a@b.com").unwrap();
        let mut tampered = issued.token.clone();
        tampered.push('x');
        assert!(signer().verify(&tampered).is_err());
        assert!(signer().verify("garbage").is_err());
    }

    #[test]
    fn test_tokens_issued_together_are_distinct() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let a = signer().issue_at(user_id, "a@b.com", now).unwrap();
        let b = signer().issue_at(user_id, "a@b.com", now).unwrap();
        assert_ne!(a.token, b.token);
    }
}
