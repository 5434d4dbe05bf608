//! Common types used across the authentication and authorization modules.
//!
//! ## Domain Types
//!
//! - [`Client`] - OAuth 2.0 client registration
//! - [`GrantType`] / [`ResponseType`] - Grant dispatch
//! - [`TokenPair`] - Access and refresh token issued together

pub mod client;
pub mod token_pair;

pub use client::{Client, GrantType, ResponseType};
pub use token_pair::{TokenPair, format_scopes, parse_scopes};
