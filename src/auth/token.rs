// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, Claims};
use crate::config::AuthSettings;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Issues and verifies session tokens with the shared secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    header: Header,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(settings: &AuthSettings) -> Self {
        let secret = settings.secret_key.as_bytes();
        let mut validation = Validation::new(settings.algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            header: Header::new(settings.algorithm),
            validation,
            lifetime: Duration::try_minutes(settings.access_token_expire_minutes)
                .unwrap_or(Duration::MAX),
        }
    }

    /// Token lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| AuthError::InternalError("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&self.header, &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                _ => AuthError::MalformedToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;

    fn service(secret: &str, minutes: i64) -> TokenService {
        TokenService::new(&AuthSettings {
            secret_key: secret.to_string(),
            algorithm: Algorithm::HS256,
            access_token_expire_minutes: minutes,
        })
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service("test-secret-key-that-is-long-enough", 30);
        let now = Utc::now();
        let token = tokens.issue_at("ada@example.com", now).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "ada@example.com");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, (now + Duration::minutes(30)).timestamp());
    }

    #[test]
    fn oversized_lifetime_fails_without_panicking() {
        let tokens = service("test-secret-key-that-is-long-enough", i64::MAX);
        assert!(matches!(
            tokens.issue("ada@example.com"),
            Err(AuthError::InternalError(_))
        ));

        let tokens = service("test-secret-key-that-is-long-enough", 1_000_000_000_000);
        assert!(matches!(
            tokens.issue("ada@example.com"),
            Err(AuthError::InternalError(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service("test-secret-key-that-is-long-enough", 30);
        let token = tokens
            .issue_at("ada@example.com", Utc::now() - Duration::hours(2))
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn expiry_within_leeway_is_accepted() {
        let tokens = service("test-secret-key-that-is-long-enough", 1);
        // Expired 30 seconds ago, inside the 60 second leeway.
        let token = tokens
            .issue_at("ada@example.com", Utc::now() - Duration::seconds(90))
            .unwrap();
        assert!(tokens.verify(&token).is_ok());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = service("first-secret-key-that-is-long-enough", 30);
        let verifier = service("second-secret-key-that-is-long-enough", 30);
        let token = issuer.issue("ada@example.com").unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let tokens = service("test-secret-key-that-is-long-enough", 30);
        assert!(matches!(
            tokens.verify("not.a.token"),
            Err(AuthError::MalformedToken)
        ));
    }
}
