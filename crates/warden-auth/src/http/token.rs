//! Token endpoint handler.
//!
//! ```text
//! POST /token
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <base64(client_id:client_secret)>
//!
//! grant_type=client_credentials&scope=read
//! ```

use axum::{
    Form, Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use super::error::no_store_headers;
use super::{OAuthState, basic_credentials};
use crate::error::AuthError;
use crate::oauth::{ClientCredentials, TokenRequest};

/// `POST /token`.
pub async fn token_handler(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Result<Response, AuthError> {
    debug!(
        grant_type = %request.grant_type,
        client_id = ?request.client_id,
        "Processing token request"
    );

    let credentials = ClientCredentials {
        basic: basic_credentials(&headers),
        client_id: request.client_id.clone(),
        client_secret: request.client_secret.clone(),
    };

    let response = state.service.token(&request, &credentials).await?;
    info!(grant_type = %request.grant_type, "Token issued");

    Ok((no_store_headers(), Json(response)).into_response())
}
