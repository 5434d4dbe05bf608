//! Token generation, validation, and management.
//!
//! This module provides:
//!
//! - The compact JWT codec with HMAC signatures
//! - Header, payload and token value objects
//! - The token lifecycle service (issue, validate, refresh, revoke)
//! - Token introspection and revocation request/response types

pub mod introspection;
pub mod jwt;
pub mod model;
pub mod revocation;
pub mod service;

pub use introspection::{IntrospectionRequest, IntrospectionResponse};
pub use jwt::{JwtCodec, JwtError, SigningAlgorithm, SigningKey};
pub use model::{Header, Payload, Token, TokenKind};
pub use revocation::{RevocationRequest, TokenTypeHint};
pub use service::{InvalidReason, TokenConfig, TokenService, ValidatedToken};
