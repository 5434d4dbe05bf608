//! Token endpoint types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange authorization code for tokens
//! - `password` - Resource owner credentials
//! - `client_credentials` - Machine-to-machine authentication
//! - `refresh_token` - Exchange a refresh token for a new pair

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::TokenPair;

/// Token request parameters.
///
/// Different fields are required depending on the `grant_type`:
///
/// - `authorization_code`: code, (optional) redirect_uri, client credentials
/// - `password`: username, password, (optional) scope
/// - `client_credentials`: client credentials, (optional) scope
/// - `refresh_token`: refresh_token
#[derive(Clone, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    pub grant_type: String,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI (must match the one used at `/authorize`, if any).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Client ID (for client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,

    /// Username (for password grant).
    #[serde(default)]
    pub username: Option<String>,

    /// Password (for password grant).
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJ0eXAi...",
///   "token_type": "bearer",
///   "expires_in": 3600,
///   "refresh_token": "eyJ0eXAi...",
///   "scope": "read write"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type, always "bearer".
    pub token_type: String,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    /// The refresh token.
    pub refresh_token: String,

    /// Granted scopes (space-separated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Builds the response for a freshly issued or refreshed pair.
    #[must_use]
    pub fn from_pair(pair: &TokenPair, now: OffsetDateTime) -> Self {
        Self {
            access_token: pair.token.as_str().to_string(),
            token_type: "bearer".to_string(),
            expires_in: pair.token.payload().expires_in(now),
            refresh_token: pair.refresh_token.as_str().to_string(),
            scope: pair.scope(),
        }
    }

    /// Form-encodes the response for an implicit-grant URI fragment.
    #[must_use]
    pub fn to_fragment(&self, state: Option<&str>) -> String {
        let mut fragment = url::form_urlencoded::Serializer::new(String::new());
        fragment
            .append_pair("access_token", &self.access_token)
            .append_pair("token_type", &self.token_type)
            .append_pair("expires_in", &self.expires_in.to_string())
            .append_pair("refresh_token", &self.refresh_token);
        if let Some(scope) = &self.scope {
            fragment.append_pair("scope", scope);
        }
        if let Some(state) = state {
            fragment.append_pair("state", state);
        }
        fragment.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> TokenResponse {
        TokenResponse {
            access_token: "a.b.c".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 60,
            refresh_token: "d.e.f".to_string(),
            scope: Some("read write".to_string()),
        }
    }

    #[test]
    fn test_response_json() {
        let json = serde_json::to_value(response()).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["expires_in"], 60);
        assert_eq!(json["scope"], "read write");

        let mut no_scope = response();
        no_scope.scope = None;
        let json = serde_json::to_value(no_scope).unwrap();
        assert!(json.get("scope").is_none());
    }

    #[test]
    fn test_fragment() {
        let fragment = response().to_fragment(Some("xyz"));
        assert_eq!(
            fragment,
            "access_token=a.b.c&token_type=bearer&expires_in=60&refresh_token=d.e.f&scope=read+write&state=xyz"
        );
    }

    #[test]
    fn test_request_debug_hides_credentials() {
        let request: TokenRequest = serde_json::from_value(serde_json::json!({
            "grant_type": "password",
            "username": "alice",
            "password": "wonderland",
            "client_secret": "s3cret"
        }))
        .unwrap();
        let debug = format!("{request:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("wonderland"));
        assert!(!debug.contains("s3cret"));
    }
}
