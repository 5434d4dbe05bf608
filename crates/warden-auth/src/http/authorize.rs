//! Authorization endpoint handler.
//!
//! ```text
//! GET /authorize?response_type=code&client_id=web&redirect_uri=...&state=xyz
//! ```
//!
//! Answers `302 Found` with a `Location` header when a redirect URI was
//! given, the JSON response otherwise.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::OAuthState;
use super::error::no_store_headers;
use crate::error::AuthError;
use crate::oauth::{AuthorizationRequest, AuthorizeOutcome};

/// `GET /authorize`.
pub async fn authorize_handler(
    State(state): State<OAuthState>,
    Query(request): Query<AuthorizationRequest>,
) -> Result<Response, AuthError> {
    debug!(
        response_type = %request.response_type,
        client_id = %request.client_id,
        "Processing authorization request"
    );

    let response = match state.service.authorize(&request).await? {
        AuthorizeOutcome::Redirect(url) => {
            let location = HeaderValue::from_str(&url)
                .map_err(|_| AuthError::invalid_request("Invalid redirect_uri"))?;
            let mut headers = no_store_headers();
            headers.insert(header::LOCATION, location);
            (StatusCode::FOUND, headers).into_response()
        }
        AuthorizeOutcome::Code(code) => (no_store_headers(), Json(code)).into_response(),
    };
    Ok(response)
}
