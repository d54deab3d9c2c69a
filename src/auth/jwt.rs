use std::sync::Arc;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig, state::AppState};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed token or signature mismatch.
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
}

/// Issues and checks HS256 tokens carrying a username subject.
///
/// Built once at startup from [`JwtConfig`]; signing and verification only
/// read the keys, so a single instance is shared across requests.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let ttl = cfg
            .ttl_minutes
            .checked_mul(60)
            .filter(|secs| *secs > 0)
            .map(Duration::seconds)
            .ok_or_else(|| anyhow::anyhow!("jwt ttl of {} minutes is out of range", cfg.ttl_minutes))?;
        Ok(Self::new(cfg.secret.as_bytes(), ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs a token for `subject` that expires `ttl` after `issued_at`.
    pub fn issue(&self, subject: &str, issued_at: OffsetDateTime) -> anyhow::Result<String> {
        let expires_at = issued_at
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("token expiry overflows the calendar"))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(subject, exp = claims.exp, "jwt issued");
        Ok(token)
    }

    /// True only for a token with a good signature whose expiry is still ahead.
    /// Never fails; every problem reads as `false`.
    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> bool {
        self.check_at(token, now).is_ok()
    }

    /// Subject of a correctly signed token. Expiry is not looked at here;
    /// call [`TokenService::validate`] first when it matters.
    pub fn subject_of(&self, token: &str) -> Result<String, TokenError> {
        self.verify_signature(token).map(|claims| claims.sub)
    }

    /// Signature and expiry check that reports which of the two failed.
    pub fn check(&self, token: &str) -> Result<Claims, TokenError> {
        self.check_at(token, OffsetDateTime::now_utc())
    }

    pub fn check_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let claims = self.verify_signature(token)?;
        if claims.exp > now.unix_timestamp() {
            Ok(claims)
        } else {
            debug!(subject = %claims.sub, exp = claims.exp, "jwt expired");
            Err(TokenError::Expired)
        }
    }

    fn verify_signature(&self, token: &str) -> Result<Claims, TokenError> {
        // Expiry is compared by hand in check_at so that it is strict and leeway-free.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "jwt rejected");
                TokenError::Invalid
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn make_service(secret: &str) -> TokenService {
        TokenService::new(secret.as_bytes(), Duration::minutes(60))
    }

    #[test]
    fn issued_token_validates_and_carries_subject() {
        let tokens = make_service("testSecretKey123456789012345678901234567890");
        let token = tokens
            .issue("testuser", OffsetDateTime::now_utc())
            .expect("issue token");
        assert!(tokens.validate(&token));
        assert_eq!(tokens.subject_of(&token).unwrap(), "testuser");
    }

    #[test]
    fn subject_is_returned_exactly() {
        let tokens = make_service("secret");
        let token = tokens.issue("alice", OffsetDateTime::now_utc()).unwrap();
        assert_eq!(tokens.subject_of(&token), Ok("alice".to_string()));
    }

    #[test]
    fn garbage_is_not_valid() {
        let tokens = make_service("secret");
        assert!(!tokens.validate("invalid.token.here"));
        assert!(!tokens.validate(""));
        assert_eq!(
            tokens.subject_of("invalid.token.here"),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let tokens = make_service("secret");
        let issued_at = datetime!(2024-03-01 12:00:00 UTC);
        let token = tokens.issue("bob", issued_at).unwrap();

        assert!(tokens.validate_at(&token, issued_at));
        assert!(tokens.validate_at(&token, issued_at + Duration::minutes(59)));
        assert!(!tokens.validate_at(&token, issued_at + Duration::minutes(60)));
        assert!(!tokens.validate_at(&token, issued_at + Duration::minutes(61)));
    }

    #[test]
    fn token_issued_long_ago_is_rejected_now() {
        let tokens = make_service("secret");
        let token = tokens
            .issue("carol", OffsetDateTime::now_utc() - Duration::hours(2))
            .unwrap();
        assert!(!tokens.validate(&token));
        assert_eq!(tokens.check(&token), Err(TokenError::Expired));
    }

    #[test]
    fn subject_of_ignores_expiry() {
        let tokens = make_service("secret");
        let token = tokens
            .issue("dave", OffsetDateTime::now_utc() - Duration::days(1))
            .unwrap();
        assert!(!tokens.validate(&token));
        assert_eq!(tokens.subject_of(&token).unwrap(), "dave");
    }

    #[test]
    fn other_secret_is_rejected() {
        let ours = make_service("our-secret");
        let theirs = make_service("their-secret");
        let token = theirs.issue("mallory", OffsetDateTime::now_utc()).unwrap();
        assert!(!ours.validate(&token));
        assert_eq!(ours.subject_of(&token), Err(TokenError::Invalid));
        assert_eq!(ours.check(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let tokens = make_service("secret");
        let token = tokens.issue("alice", OffsetDateTime::now_utc()).unwrap();
        let forged = tokens.issue("admin", OffsetDateTime::now_utc()).unwrap();

        // Graft the forged payload onto the original signature.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert!(!tokens.validate(&spliced));
        assert_eq!(tokens.subject_of(&spliced), Err(TokenError::Invalid));
    }

    #[test]
    fn expiry_past_the_calendar_is_an_error() {
        let tokens = make_service("secret");
        let err = tokens
            .issue("alice", datetime!(9999-12-31 23:30:00 UTC))
            .unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn from_config_rejects_unusable_ttl() {
        let cfg = |ttl_minutes| JwtConfig {
            secret: "secret".into(),
            ttl_minutes,
        };
        assert!(TokenService::from_config(&cfg(0)).is_err());
        assert!(TokenService::from_config(&cfg(-5)).is_err());
        assert!(TokenService::from_config(&cfg(i64::MAX)).is_err());

        let tokens = TokenService::from_config(&cfg(90)).unwrap();
        assert_eq!(tokens.ttl(), Duration::minutes(90));
    }

    #[test]
    fn check_returns_claims_for_fresh_token() {
        let tokens = make_service("secret");
        let issued_at = OffsetDateTime::now_utc();
        let token = tokens.issue("erin", issued_at).unwrap();
        let claims = tokens.check(&token).unwrap();
        assert_eq!(claims.sub, "erin");
        assert_eq!(claims.iat, issued_at.unix_timestamp());
        assert_eq!(claims.exp - claims.iat, tokens.ttl().whole_seconds());
    }
}
