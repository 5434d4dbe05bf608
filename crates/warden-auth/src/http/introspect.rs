//! Token introspection endpoint handler.
//!
//! ```text
//! POST /introspection?token=<token>&token_type_hint=refresh_token
//! ```
//!
//! An active token answers its claims; anything else is `401`.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};

use super::OAuthState;
use super::error::no_store_headers;
use crate::error::AuthError;
use crate::token::IntrospectionRequest;

/// `POST /introspection`.
pub async fn introspect_handler(
    State(state): State<OAuthState>,
    Query(request): Query<IntrospectionRequest>,
) -> Result<Response, AuthError> {
    let response = state
        .service
        .introspect(&request.token, request.token_type_hint.as_deref())
        .await?;
    Ok((no_store_headers(), Json(response)).into_response())
}
