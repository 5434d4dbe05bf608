//! Token introspection
//!
//! Maps a validated token onto an RFC 7662 shaped response. Tokens that do
//! not validate are answered with 401 by the handler, so a response built
//! here is always `active`.
//!
//! # References
//!
//! - [RFC 7662 - OAuth 2.0 Token Introspection](https://tools.ietf.org/html/rfc7662)

use serde::{Deserialize, Serialize};

use super::service::ValidatedToken;
use crate::types::format_scopes;

// =============================================================================
// Request Types
// =============================================================================

/// Token introspection request.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect.
    pub token: String,

    /// Optional hint about the token type. Unknown values are ignored.
    #[serde(default)]
    pub token_type_hint: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Token introspection response.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    pub active: bool,

    /// Subject identifier (user or client ID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Intended audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not before time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issuer of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// JWT ID, shared by both halves of the pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// `bearer` for access tokens, `refresh_token` for refresh tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Space-separated granted scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl IntrospectionResponse {
    /// Creates an inactive response.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Builds the response for a token that passed validation.
    #[must_use]
    pub fn from_validated(validated: &ValidatedToken) -> Self {
        let payload = validated.token.payload();
        Self {
            active: true,
            sub: Some(payload.sub.clone()),
            aud: payload.aud.clone(),
            exp: Some(payload.exp.unix_timestamp()),
            iat: Some(payload.iat.unix_timestamp()),
            nbf: Some(payload.nbf.unix_timestamp()),
            iss: Some(payload.iss.clone()),
            jti: Some(payload.jti.clone()),
            token_type: Some(validated.kind.token_type().to_string()),
            scope: format_scopes(&validated.scopes),
            client_id: validated.client_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use time::macros::datetime;

    use super::*;
    use crate::token::jwt::{JwtCodec, SigningAlgorithm, SigningKey};
    use crate::token::model::{Payload, TokenKind};

    #[test]
    fn test_inactive_serializes_only_active() {
        let json = serde_json::to_value(IntrospectionResponse::inactive()).unwrap();
        assert_eq!(json, serde_json::json!({"active": false}));
    }

    #[test]
    fn test_from_validated() {
        let codec = JwtCodec::new(SigningKey::new(SigningAlgorithm::HmacSha256, "k"));
        let token = codec
            .sign(&Payload {
                iss: "warden".to_string(),
                sub: "alice".to_string(),
                aud: None,
                exp: datetime!(2021-07-01 12:01:00 UTC),
                nbf: datetime!(2021-07-01 12:00:00 UTC),
                iat: datetime!(2021-07-01 12:00:00 UTC),
                jti: "j1".to_string(),
            })
            .unwrap();

        let validated = ValidatedToken {
            token,
            kind: TokenKind::Refresh,
            scopes: BTreeSet::from(["write".to_string(), "read".to_string()]),
            client_id: Some("web".to_string()),
        };
        let response = IntrospectionResponse::from_validated(&validated);

        assert!(response.active);
        assert_eq!(response.sub.as_deref(), Some("alice"));
        assert_eq!(response.exp, Some(1_625_140_860));
        assert_eq!(response.jti.as_deref(), Some("j1"));
        assert_eq!(response.token_type.as_deref(), Some("refresh_token"));
        assert_eq!(response.scope.as_deref(), Some("read write"));
        assert_eq!(response.client_id.as_deref(), Some("web"));
        assert!(response.aud.is_none());
    }
}
