//! OAuth 2.0 authorization server implementation.
//!
//! This module provides the protocol surface on top of the token service:
//!
//! - [`authorize`] - Request/response types for the authorization endpoint
//! - [`token`] - Request/response types for the token endpoint
//! - [`client_auth`] - HTTP Basic and form-parameter client authentication
//! - [`service`] - Grant dispatch, redirect allow-listing, introspection and
//!   revocation
//!
//! # Example
//!
//! ```ignore
//! use warden_auth::oauth::{OAuthService, TokenRequest, ClientCredentials};
//!
//! let service = OAuthService::new(tokens, clients, codes, enabled_grants);
//! let response = service.token(&request, &credentials).await?;
//! ```

pub mod authorize;
pub mod client_auth;
pub mod service;
pub mod token;

pub use authorize::{
    AuthorizationRequest, AuthorizationResponse, AuthorizeOutcome, implicit_redirect_url,
};
pub use client_auth::{ClientCredentials, authenticate_client, parse_basic_auth};
pub use service::OAuthService;
pub use token::{TokenRequest, TokenResponse};
