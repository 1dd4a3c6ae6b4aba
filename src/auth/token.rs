//! Token issuance and verification.
//!
//! Tokens are self-contained HMAC-signed claim sets; validity is a pure
//! function of the token, the process-wide secret, and the clock. Nothing is
//! persisted and verification never consumes a token.

use std::str::FromStr;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

fn algorithm(config: &JwtSettings) -> Result<Algorithm, AppError> {
    Algorithm::from_str(&config.algorithm).map_err(|_| {
        AppError::Internal(format!("Unsupported signing algorithm: {}", config.algorithm))
    })
}

/// Issue a signed token of the given kind, expiring `ttl_seconds` from now.
pub fn issue_token(
    subject: &str,
    role: &str,
    kind: TokenKind,
    ttl_seconds: i64,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(subject.to_string(), role.to_string(), kind, ttl_seconds);

    encode(
        &Header::new(algorithm(config)?),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Issue a short-lived access token with the configured TTL.
pub fn issue_access_token(
    subject: &str,
    role: &str,
    config: &JwtSettings,
) -> Result<String, AppError> {
    issue_token(
        subject,
        role,
        TokenKind::Access,
        config.access_token_expiry,
        config,
    )
}

/// Issue a long-lived refresh token with the configured TTL.
pub fn issue_refresh_token(
    subject: &str,
    role: &str,
    config: &JwtSettings,
) -> Result<String, AppError> {
    issue_token(
        subject,
        role,
        TokenKind::Refresh,
        config.refresh_token_expiry,
        config,
    )
}

/// Verify signature, expiry, and kind, returning the embedded claims.
///
/// # Errors
/// - `TokenInvalid` for a bad signature or malformed structure
/// - `TokenExpired` once `exp` has elapsed
/// - `TokenKindMismatch` when the embedded kind differs from `expected`
pub fn verify_token(
    token: &str,
    expected: TokenKind,
    config: &JwtSettings,
) -> Result<Claims, AppError> {
    let mut validation = Validation::new(algorithm(config)?);
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Auth(AuthError::TokenExpired)
        }
        _ => {
            tracing::warn!("Token validation error: {}", e);
            AppError::Auth(AuthError::TokenInvalid)
        }
    })?;

    if data.claims.kind != expected {
        return Err(AppError::Auth(AuthError::TokenKindMismatch {
            expected: expected.as_str(),
        }));
    }

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::ROLE_USER;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            algorithm: "HS256".to_string(),
            access_token_expiry: 1800,
            refresh_token_expiry: 604800,
        }
    }

    #[test]
    fn round_trip_preserves_claims() {
        let config = get_test_config();

        let token = issue_access_token("user@example.com", ROLE_USER, &config)
            .expect("Failed to issue token");
        let claims =
            verify_token(&token, TokenKind::Access, &config).expect("Failed to verify token");

        assert_eq!(claims.sub, "user@example.com");
        assert_eq!(claims.role, ROLE_USER);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp, claims.iat + config.access_token_expiry);
    }

    #[test]
    fn refresh_round_trip_uses_refresh_ttl() {
        let config = get_test_config();

        let token = issue_refresh_token("user@example.com", ROLE_USER, &config).unwrap();
        let claims = verify_token(&token, TokenKind::Refresh, &config).unwrap();

        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.exp, claims.iat + config.refresh_token_expiry);
    }

    #[test]
    fn expired_token_fails_with_token_expired() {
        let config = get_test_config();

        let token =
            issue_token("user@example.com", ROLE_USER, TokenKind::Access, -10, &config).unwrap();

        match verify_token(&token, TokenKind::Access, &config) {
            Err(AppError::Auth(AuthError::TokenExpired)) => (),
            other => panic!("Expected TokenExpired, got {:?}", other),
        }
    }

    #[test]
    fn refresh_token_is_rejected_where_access_is_expected() {
        let config = get_test_config();

        let token = issue_refresh_token("user@example.com", ROLE_USER, &config).unwrap();

        match verify_token(&token, TokenKind::Access, &config) {
            Err(AppError::Auth(AuthError::TokenKindMismatch { expected })) => {
                assert_eq!(expected, "access");
            }
            other => panic!("Expected TokenKindMismatch, got {:?}", other),
        }
    }

    #[test]
    fn access_token_is_rejected_where_refresh_is_expected() {
        let config = get_test_config();

        let token = issue_access_token("user@example.com", ROLE_USER, &config).unwrap();

        match verify_token(&token, TokenKind::Refresh, &config) {
            Err(AppError::Auth(AuthError::TokenKindMismatch { expected })) => {
                assert_eq!(expected, "refresh");
            }
            other => panic!("Expected TokenKindMismatch, got {:?}", other),
        }
    }

    #[test]
    fn tampered_token_fails_with_token_invalid() {
        let config = get_test_config();

        let token = issue_access_token("user@example.com", ROLE_USER, &config).unwrap();
        let tampered = format!("{}X", token);

        match verify_token(&tampered, TokenKind::Access, &config) {
            Err(AppError::Auth(AuthError::TokenInvalid)) => (),
            other => panic!("Expected TokenInvalid, got {:?}", other),
        }
    }

    #[test]
    fn garbage_fails_with_token_invalid() {
        let config = get_test_config();

        match verify_token("not.a.token", TokenKind::Access, &config) {
            Err(AppError::Auth(AuthError::TokenInvalid)) => (),
            other => panic!("Expected TokenInvalid, got {:?}", other),
        }
    }

    #[test]
    fn token_signed_with_other_secret_fails() {
        let config = get_test_config();
        let mut other = get_test_config();
        other.secret = "another-secret-key-also-32-characters-xx".to_string();

        let token = issue_access_token("user@example.com", ROLE_USER, &other).unwrap();

        assert!(verify_token(&token, TokenKind::Access, &config).is_err());
    }

    #[test]
    fn verification_is_repeatable() {
        let config = get_test_config();

        let token = issue_access_token("user@example.com", ROLE_USER, &config).unwrap();

        let first = verify_token(&token, TokenKind::Access, &config).unwrap();
        let second = verify_token(&token, TokenKind::Access, &config).unwrap();
        assert_eq!(first.sub, second.sub);
        assert_eq!(first.exp, second.exp);
    }
}
