//! Authorization code storage.
//!
//! # Security Considerations
//!
//! - Codes are single-use: `consume` removes the code before returning it
//! - Codes expire after the configured lifetime
//! - Codes carry no secret of their own; the client must authenticate when
//!   exchanging one

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::clock::Clock;
use crate::error::AuthError;

/// An issued authorization code and what it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// Opaque code value.
    pub code: String,
    /// Subject the code was issued for.
    pub subject: String,
    /// Client the code was issued to.
    pub client_id: String,
    /// Requested scope, as sent by the client.
    pub scope: Option<String>,
    /// Redirect URI used at `/authorize`, if any.
    pub redirect_uri: Option<String>,
    /// Expiration time.
    pub expires_at: OffsetDateTime,
}

/// Issuer and single-use store of authorization codes.
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Issues a new code bound to `(subject, client_id, scope)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be stored.
    async fn issue(
        &self,
        subject: &str,
        client_id: &str,
        scope: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> AuthResult<AuthorizationCode>;

    /// Consumes a code.
    ///
    /// # Returns
    ///
    /// Returns `None` if the code is unknown, already consumed, or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Removes expired codes and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn sweep_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}

/// In-process authorization code store.
#[derive(Debug)]
pub struct MemoryAuthorizationCodes {
    codes: DashMap<String, AuthorizationCode>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryAuthorizationCodes {
    /// Creates a store whose codes live for `lifetime`.
    #[must_use]
    pub fn new(lifetime: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            codes: DashMap::new(),
            lifetime: Duration::seconds(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX)),
            clock,
        }
    }

    fn generate_code() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }
}

#[async_trait]
impl AuthorizationCodeStore for MemoryAuthorizationCodes {
    async fn issue(
        &self,
        subject: &str,
        client_id: &str,
        scope: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> AuthResult<AuthorizationCode> {
        let expires_at = self
            .clock
            .now()
            .checked_add(self.lifetime)
            .ok_or_else(|| AuthError::configuration("authorization code lifetime overflows"))?;
        let code = AuthorizationCode {
            code: Self::generate_code(),
            subject: subject.to_string(),
            client_id: client_id.to_string(),
            scope: scope.map(str::to_string),
            redirect_uri: redirect_uri.map(str::to_string),
            expires_at,
        };
        self.codes.insert(code.code.clone(), code.clone());
        Ok(code)
    }

    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let now = self.clock.now();
        Ok(self
            .codes
            .remove(code)
            .map(|(_, issued)| issued)
            .filter(|issued| now < issued.expires_at))
    }

    async fn sweep_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut removed = 0;
        self.codes.retain(|_, code| {
            let keep = now < code.expires_at;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
