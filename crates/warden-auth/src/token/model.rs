//! Token value objects.
//!
//! A [`Token`] is the decoded form of a compact `header.payload.signature`
//! string. It keeps the exact encoded string it was built from, so that the
//! wire form handed to a client is byte-identical to what the store holds.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::jwt::SigningAlgorithm;

/// The only token type this server emits.
pub const TOKEN_TYPE_JWT: &str = "JWT";

// ============================================================================
// Header
// ============================================================================

/// JOSE header of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Token type, always `JWT` for tokens issued here.
    pub typ: String,

    /// Content type of nested tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,

    /// Name of the HMAC variant the signature was computed with.
    pub alg: String,
}

impl Header {
    /// Creates a header for the given algorithm using its canonical tag.
    #[must_use]
    pub fn new(algorithm: SigningAlgorithm) -> Self {
        Self {
            typ: TOKEN_TYPE_JWT.to_string(),
            cty: None,
            alg: algorithm.as_str().to_string(),
        }
    }

    /// Resolves the `alg` tag, if it names a supported algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Option<SigningAlgorithm> {
        SigningAlgorithm::parse(&self.alg)
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Registered claims carried by every access and refresh token.
///
/// Timestamps are serialized as whole Unix seconds. Issuers must truncate
/// the instants they put here to second precision, otherwise a payload will
/// not compare equal to its own decoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Issuer.
    pub iss: String,

    /// Subject (user name or client id).
    pub sub: String,

    /// Audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time.
    #[serde(with = "time::serde::timestamp")]
    pub exp: OffsetDateTime,

    /// Not valid before.
    #[serde(with = "time::serde::timestamp")]
    pub nbf: OffsetDateTime,

    /// Issued at.
    #[serde(with = "time::serde::timestamp")]
    pub iat: OffsetDateTime,

    /// Token id. Shared by both halves of a [`TokenPair`](crate::types::TokenPair).
    pub jti: String,
}

impl Payload {
    /// Returns `true` if `now` lies in the half-open window `[nbf, exp)`.
    #[must_use]
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        self.nbf <= now && now < self.exp
    }

    /// Seconds remaining until expiry, clamped at zero.
    #[must_use]
    pub fn expires_in(&self, now: OffsetDateTime) -> i64 {
        (self.exp - now).whole_seconds().max(0)
    }
}

// ============================================================================
// Token
// ============================================================================

/// A signed token together with its compact encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    header: Header,
    payload: Payload,
    signature: String,
    encoded: String,
}

impl Token {
    pub(crate) fn from_parts(
        header: Header,
        payload: Payload,
        signature: String,
        encoded: String,
    ) -> Self {
        Self {
            header,
            payload,
            signature,
            encoded,
        }
    }

    /// The JOSE header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The claims.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The base64url signature segment.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The compact `header.payload.signature` form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Consumes the token and returns its compact form.
    #[must_use]
    pub fn into_string(self) -> String {
        self.encoded
    }

    /// Shortcut for `payload().jti`.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.payload.jti
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Selects one half of a token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The short-lived bearer token.
    Access,
    /// The long-lived token used to obtain a new pair.
    Refresh,
}

impl TokenKind {
    /// Returns the introspection `token_type` for this half.
    #[must_use]
    pub fn token_type(&self) -> &'static str {
        match self {
            Self::Access => "bearer",
            Self::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}
