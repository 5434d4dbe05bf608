//! Token store that keeps nothing.
//!
//! With this backend a token is valid as long as its signature checks out and
//! the current time lies inside its own `[nbf, exp)` window. Revocation has no
//! effect and a refresh token can be replayed until it expires.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::token::TokenStore;
use crate::AuthResult;
use crate::types::TokenPair;

/// Non-storing token backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatelessTokenStore;

impl StatelessTokenStore {
    /// Creates the store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenStore for StatelessTokenStore {
    async fn reserve_id(&self) -> AuthResult<String> {
        Ok(Uuid::new_v4().to_string())
    }

    async fn find(&self, _id: &str) -> AuthResult<Option<TokenPair>> {
        Ok(None)
    }

    async fn put(&self, _pair: &TokenPair) -> AuthResult<()> {
        Ok(())
    }

    async fn take(&self, _id: &str) -> AuthResult<Option<TokenPair>> {
        Ok(None)
    }

    async fn remove(&self, _id: &str) -> AuthResult<()> {
        Ok(())
    }

    async fn remove_all(&self) -> AuthResult<()> {
        Ok(())
    }

    async fn sweep_expired(&self, _now: OffsetDateTime) -> AuthResult<u64> {
        Ok(0)
    }

    fn is_stateful(&self) -> bool {
        false
    }
}
