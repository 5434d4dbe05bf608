//! OAuth 2.0 client and dispatch types.
//!
//! Grant and response types are parsed from their wire strings into closed
//! enums. Anything this server does not implement lands in the `Unsupported`
//! case and is answered with 501.

use std::fmt;

use subtle::ConstantTimeEq;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// Authorization Code flow.
    AuthorizationCode,
    /// Implicit flow, entered through `/authorize?response_type=token`.
    Implicit,
    /// Resource Owner Password Credentials flow.
    Password,
    /// Client Credentials flow.
    ClientCredentials,
    /// Refresh Token flow.
    RefreshToken,
    /// Any other `grant_type` value.
    Unsupported(String),
}

impl GrantType {
    /// Every grant this server implements.
    #[must_use]
    pub fn supported() -> Vec<Self> {
        vec![
            Self::AuthorizationCode,
            Self::Implicit,
            Self::Password,
            Self::ClientCredentials,
            Self::RefreshToken,
        ]
    }

    /// Grants a client registered without an explicit list may use; the
    /// implicit grant is opt-in.
    #[must_use]
    pub fn client_defaults() -> Vec<Self> {
        Self::supported()
            .into_iter()
            .filter(|grant| *grant != Self::Implicit)
            .collect()
    }

    /// Maps a wire value onto the enum. Never fails.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "authorization_code" => Self::AuthorizationCode,
            "implicit" => Self::Implicit,
            "password" => Self::Password,
            "client_credentials" => Self::ClientCredentials,
            "refresh_token" => Self::RefreshToken,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Implicit => "implicit",
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::Unsupported(value) => value,
        }
    }

    /// Returns `true` unless this is the `Unsupported` case.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Response Type
// =============================================================================

/// `/authorize` response types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// Authorization code.
    Code,
    /// Implicit token.
    Token,
    /// Any other `response_type` value.
    Unsupported(String),
}

impl ResponseType {
    /// Maps a wire value onto the enum. Never fails.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "code" => Self::Code,
            "token" => Self::Token,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
            Self::Unsupported(value) => value,
        }
    }

    /// The grant that must be enabled for this response type.
    #[must_use]
    pub fn grant_type(&self) -> Option<GrantType> {
        match self {
            Self::Code => Some(GrantType::AuthorizationCode),
            Self::Token => Some(GrantType::Implicit),
            Self::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth 2.0 client.
#[derive(Clone)]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Shared client secret.
    pub secret: String,

    /// Allowed redirect URI prefixes.
    pub redirect_uris: Vec<String>,

    /// Grant types this client may use.
    pub grant_types: Vec<GrantType>,
}

impl Client {
    /// Checks a redirect URI against the allow-list.
    ///
    /// Each entry is a prefix, compared ASCII case-insensitively.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        let uri = uri.as_bytes();
        self.redirect_uris.iter().any(|allowed| {
            let allowed = allowed.as_bytes();
            !allowed.is_empty()
                && uri.len() >= allowed.len()
                && uri[..allowed.len()].eq_ignore_ascii_case(allowed)
        })
    }

    /// Checks whether the client is allowed to use `grant`.
    #[must_use]
    pub fn is_grant_allowed(&self, grant: &GrantType) -> bool {
        self.grant_types.contains(grant)
    }

    /// Compares `presented` with the client secret in constant time.
    #[must_use]
    pub fn verify_secret(&self, presented: &str) -> bool {
        self.secret.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id)
            .field("secret", &"[REDACTED]")
            .field("redirect_uris", &self.redirect_uris)
            .field("grant_types", &self.grant_types)
            .finish()
    }
}
