//! # warden-auth
//!
//! OAuth 2.0 token issuance and validation built on signed, self-contained
//! tokens.
//!
//! This crate provides:
//! - A compact JWT codec with HMAC signatures (MD5, SHA-1, SHA-2 family)
//! - Access/refresh token pairs sharing one identifier
//! - Pluggable token stores (in-memory, non-storing, durable in
//!   `warden-auth-postgres`)
//! - The grant flows: authorization code, implicit, password, client
//!   credentials and refresh token
//! - Introspection and revocation
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`token`] - Codec, token model and the token lifecycle service
//! - [`storage`] - Token store, client registry, credential verifier and
//!   authorization code traits with their in-process implementations
//! - [`oauth`] - Grant dispatch and endpoint request/response types
//! - [`http`] - Axum handlers for the OAuth endpoints
//! - [`clock`] - Time source abstraction

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use http::{OAuthState, router};
pub use oauth::OAuthService;
pub use storage::{
    AuthorizationCodeStore, ClientRegistry, CredentialVerifier, MemoryTokenStore,
    StatelessTokenStore, TokenStore,
};
pub use token::{JwtCodec, SigningAlgorithm, TokenKind, TokenService};
pub use types::{Client, GrantType, TokenPair};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use warden_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{OAuthState, router};
    pub use crate::oauth::OAuthService;
    pub use crate::storage::{
        AuthorizationCodeStore, ClientRegistry, ConfigCredentialVerifier, CredentialVerifier,
        MemoryAuthorizationCodes, MemoryTokenStore, StatelessTokenStore, StaticClientRegistry,
        TokenStore,
    };
    pub use crate::token::{JwtCodec, TokenConfig, TokenKind, TokenService};
    pub use crate::types::{Client, GrantType, TokenPair};
}
