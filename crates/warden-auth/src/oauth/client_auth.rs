//! Client authentication for the token and revocation endpoints.
//!
//! Two methods are accepted, tried in this order:
//!
//! 1. HTTP Basic (`Authorization: Basic base64(client_id:client_secret)`)
//! 2. `client_id` and `client_secret` form parameters
//!
//! Secrets are compared in constant time.

use tracing::debug;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::ClientRegistry;
use crate::types::Client;

/// Credentials a client presented with a request.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    /// From the `Authorization: Basic` header.
    pub basic: Option<(String, String)>,
    /// `client_id` form parameter.
    pub client_id: Option<String>,
    /// `client_secret` form parameter.
    pub client_secret: Option<String>,
}

impl ClientCredentials {
    /// The client id the request claims, from either method.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.basic
            .as_ref()
            .map(|(id, _)| id.as_str())
            .or(self.client_id.as_deref())
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id())
            .finish_non_exhaustive()
    }
}

/// Authenticates a client.
///
/// # Errors
///
/// Returns `AuthError::InvalidClient` if no credentials were presented, the
/// client is unknown, or the secret does not match.
pub async fn authenticate_client(
    credentials: &ClientCredentials,
    registry: &dyn ClientRegistry,
) -> AuthResult<Client> {
    // 1. HTTP Basic
    let (client_id, secret) = if let Some((id, secret)) = &credentials.basic {
        (id.as_str(), secret.as_str())
    // 2. client_secret_post
    } else if let (Some(id), Some(secret)) = (&credentials.client_id, &credentials.client_secret)
    {
        (id.as_str(), secret.as_str())
    } else {
        return Err(AuthError::invalid_client("No client credentials provided"));
    };

    let Some(client) = registry.find_by_client_id(client_id).await? else {
        debug!(client_id = %client_id, "Unknown client");
        return Err(AuthError::invalid_client("Client authentication failed"));
    };

    if !client.verify_secret(secret) {
        debug!(client_id = %client_id, "Client secret mismatch");
        return Err(AuthError::invalid_client("Client authentication failed"));
    }

    Ok(client)
}

/// Parses HTTP Basic Auth header.
///
/// # Returns
///
/// Returns `Some((client_id, client_secret))` if valid, `None` otherwise.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (secret may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;

    Some((client_id.to_string(), client_secret.to_string()))
}
