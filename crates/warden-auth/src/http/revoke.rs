//! Token revocation endpoint handler (RFC 7009).
//!
//! ```text
//! POST /revoke
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <client_credentials>
//!
//! token=<token_to_revoke>&token_type_hint=refresh_token
//! ```
//!
//! Always `200 OK` once the client authenticated, whether or not the token
//! was known.

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use super::{OAuthState, basic_credentials};
use crate::error::AuthError;
use crate::oauth::ClientCredentials;
use crate::token::RevocationRequest;

/// `POST /revoke`.
pub async fn revoke_handler(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    Form(request): Form<RevocationRequest>,
) -> Result<StatusCode, AuthError> {
    let credentials = ClientCredentials {
        basic: basic_credentials(&headers),
        client_id: request.client_id.clone(),
        client_secret: request.client_secret.clone(),
    };

    state.service.revoke(&request, &credentials).await?;
    Ok(StatusCode::OK)
}
