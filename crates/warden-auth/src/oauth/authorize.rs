//! Authorization endpoint types.
//!
//! `/authorize` serves two response types:
//!
//! - `code`: issues an authorization code for the client itself, then either
//!   redirects to `redirect_uri?code=...&state=...` or answers `{code, state}`
//! - `token`: implicit grant; issues a token pair for the client and
//!   redirects with the token response in the URI fragment. A redirect URI
//!   is mandatory
//!
//! A `redirect_uri` is only followed after it passed the client's prefix
//! allow-list.

use serde::{Deserialize, Serialize};

use super::token::TokenResponse;

/// Authorization request parameters.
///
/// # Example
///
/// ```ignore
/// GET /authorize?
///   response_type=code
///   &client_id=web
///   &redirect_uri=https://app.example.com/callback
///   &scope=read
///   &state=abc123xyz
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    /// `code` or `token`.
    pub response_type: String,

    /// Client identifier.
    pub client_id: String,

    /// Where to send the response. Must match an allowed prefix.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Requested scopes.
    #[serde(default)]
    pub scope: Option<String>,

    /// Opaque value echoed back to the client.
    #[serde(default)]
    pub state: Option<String>,
}

/// Authorization code response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// The issued authorization code.
    pub code: String,

    /// State from the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: impl Into<String>, state: Option<String>) -> Self {
        Self {
            code: code.into(),
            state,
        }
    }

    /// Builds the redirect URL with code and state as query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `redirect_uri` is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(state) = &self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// Builds an implicit-grant redirect with the token response in the fragment.
///
/// # Errors
///
/// Returns an error if `redirect_uri` is not an absolute URL.
pub fn implicit_redirect_url(
    redirect_uri: &str,
    response: &TokenResponse,
    state: Option<&str>,
) -> Result<String, url::ParseError> {
    let mut url = url::Url::parse(redirect_uri)?;
    url.set_fragment(Some(&response.to_fragment(state)));
    Ok(url.to_string())
}

/// What `/authorize` answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// Redirect to this URL.
    Redirect(String),
    /// No redirect URI was given; answer the code as JSON.
    Code(AuthorizationResponse),
}
