//! Credential verification for the password grant.
//!
//! User management lives outside this crate; the token service only needs to
//! ask whether a subject exists and whether a secret matches.

use std::collections::HashMap;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;

use crate::config::UserConfig;
use crate::error::AuthError;
use crate::AuthResult;

/// Opaque verifier of subject credentials.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns `true` if `subject` is a known user.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn exists(&self, subject: &str) -> AuthResult<bool>;

    /// Returns `true` if `secret` is the credential of `subject`.
    ///
    /// Unknown subjects verify as `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or the stored credential is corrupt.
    async fn verify(&self, subject: &str, secret: &str) -> AuthResult<bool>;
}

/// Verifier over users listed in configuration, with argon2 PHC hashes.
#[derive(Debug, Default)]
pub struct ConfigCredentialVerifier {
    hashes: HashMap<String, String>,
}

impl ConfigCredentialVerifier {
    /// Creates a verifier from configured users.
    #[must_use]
    pub fn new(users: &[UserConfig]) -> Self {
        Self {
            hashes: users
                .iter()
                .map(|u| (u.username.clone(), u.password_hash.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl CredentialVerifier for ConfigCredentialVerifier {
    async fn exists(&self, subject: &str) -> AuthResult<bool> {
        Ok(self.hashes.contains_key(subject))
    }

    async fn verify(&self, subject: &str, secret: &str) -> AuthResult<bool> {
        let Some(stored) = self.hashes.get(subject) else {
            return Ok(false);
        };

        let hash = PasswordHash::new(stored).map_err(|_| {
            AuthError::configuration(format!("password hash for '{subject}' is malformed"))
        })?;

        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &hash)
            .is_ok())
    }
}
