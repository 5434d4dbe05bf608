//! Token revocation (RFC 7009)
//!
//! The client presents either half of a pair; the whole pair is revoked.
//! The endpoint answers 200 whether or not the token was known, so that
//! callers cannot test which tokens are valid.
//!
//! # References
//!
//! - [RFC 7009 - OAuth 2.0 Token Revocation](https://tools.ietf.org/html/rfc7009)

use serde::Deserialize;

use super::model::TokenKind;

// =============================================================================
// Request Types
// =============================================================================

/// Token revocation request.
#[derive(Debug, Clone, Deserialize)]
pub struct RevocationRequest {
    /// The token to revoke.
    pub token: String,

    /// Optional hint about the token type. Unknown values are ignored.
    #[serde(default)]
    pub token_type_hint: Option<String>,

    /// Client identifier, when not sent with HTTP Basic.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret, when not sent with HTTP Basic.
    #[serde(default)]
    pub client_secret: Option<String>,
}

// =============================================================================
// Token Type Hint
// =============================================================================

/// Token type hints shared by introspection and revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTypeHint {
    /// The token is an access token.
    AccessToken,
    /// The token is a refresh token.
    RefreshToken,
}

impl TokenTypeHint {
    /// Parses a hint; unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }

    /// Parses an optional hint straight into the half to look up.
    #[must_use]
    pub fn kind_of(hint: Option<&str>) -> Option<TokenKind> {
        hint.and_then(Self::parse).map(Self::kind)
    }

    /// Returns the token type hint as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// The half of a pair this hint points at.
    #[must_use]
    pub fn kind(self) -> TokenKind {
        match self {
            Self::AccessToken => TokenKind::Access,
            Self::RefreshToken => TokenKind::Refresh,
        }
    }
}

impl std::fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_parsing() {
        assert_eq!(
            TokenTypeHint::parse("access_token"),
            Some(TokenTypeHint::AccessToken)
        );
        assert_eq!(TokenTypeHint::parse("id_token"), None);
        assert_eq!(
            TokenTypeHint::kind_of(Some("refresh_token")),
            Some(TokenKind::Refresh)
        );
        assert_eq!(TokenTypeHint::kind_of(Some("bogus")), None);
        assert_eq!(TokenTypeHint::kind_of(None), None);
    }

    #[test]
    fn test_request_deserialization() {
        let request: RevocationRequest =
            serde_json::from_str(r#"{"token":"abc","token_type_hint":"whatever"}"#).unwrap();
        assert_eq!(request.token, "abc");
        assert_eq!(request.token_type_hint.as_deref(), Some("whatever"));
        assert!(request.client_id.is_none());
    }
}
