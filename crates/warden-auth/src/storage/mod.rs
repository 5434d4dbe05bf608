//! Storage traits for authentication and authorization data.
//!
//! This module defines storage interfaces for:
//!
//! - Token pairs ([`TokenStore`])
//! - OAuth client registrations ([`ClientRegistry`])
//! - User credentials ([`CredentialVerifier`])
//! - Authorization codes ([`AuthorizationCodeStore`])
//!
//! # Implementations
//!
//! In-process implementations live here. The durable token backend is
//! provided in a separate crate:
//!
//! - `warden-auth-postgres` - PostgreSQL storage backend

pub mod client;
pub mod code;
pub mod memory;
pub mod stateless;
pub mod token;
pub mod user;

pub use client::{ClientRegistry, StaticClientRegistry};
pub use code::{AuthorizationCode, AuthorizationCodeStore, MemoryAuthorizationCodes};
pub use memory::MemoryTokenStore;
pub use stateless::StatelessTokenStore;
pub use token::TokenStore;
pub use user::{ConfigCredentialVerifier, CredentialVerifier};
