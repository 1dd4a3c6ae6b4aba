//! Token claims and the identity value type produced by authentication.

use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// Token purpose tag. Access tokens authorize API calls, refresh tokens
/// authorize minting new token pairs; a verifier accepts exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Signed token payload.
///
/// `sub` carries the account email and `role` the role tag at issuance time.
/// `exp` and `type` are mandatory: a token missing either fails
/// deserialization and therefore verification.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: String, role: String, kind: TokenKind, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub,
            role,
            kind,
            exp: now + ttl_seconds,
            iat: now,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            subject: self.sub.clone(),
            role: self.role.clone(),
        }
    }
}

/// The authenticated caller as asserted by a verified access token.
///
/// The role here is the claim-carried one; guards that must not trust a
/// stale claim re-resolve the account instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}
