//! HTTP handlers for the OAuth 2.0 endpoints.
//!
//! # Routes
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/authorize` | [`authorize_handler`] |
//! | POST | `/token` | [`token_handler`] |
//! | POST | `/introspection` | [`introspect_handler`] |
//! | POST | `/revoke` | [`revoke_handler`] |
//! | GET | `/healthz` | [`healthz_handler`] |

pub mod authorize;
pub mod error;
pub mod introspect;
pub mod revoke;
pub mod token;

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};

use crate::oauth::{OAuthService, parse_basic_auth};

pub use authorize::authorize_handler;
pub use error::ErrorBody;
pub use introspect::introspect_handler;
pub use revoke::revoke_handler;
pub use token::token_handler;

/// Shared state of the OAuth handlers.
#[derive(Clone)]
pub struct OAuthState {
    /// Protocol service.
    pub service: Arc<OAuthService>,
}

impl OAuthState {
    /// Creates the handler state.
    pub fn new(service: Arc<OAuthService>) -> Self {
        Self { service }
    }
}

/// Builds the router with every OAuth endpoint.
pub fn router(state: OAuthState) -> Router {
    Router::new()
        .route("/authorize", get(authorize_handler))
        .route("/token", post(token_handler))
        .route("/introspection", post(introspect_handler))
        .route("/revoke", post(revoke_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

/// Liveness check.
pub async fn healthz_handler() -> &'static str {
    "ok"
}

/// Credentials from an `Authorization: Basic` header, if any.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_auth)
}
