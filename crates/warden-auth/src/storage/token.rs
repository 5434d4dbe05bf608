//! Token pair storage trait.
//!
//! This module defines the capability every token backend provides to the
//! [`TokenService`](crate::token::TokenService).
//!
//! # Consistency
//!
//! - `reserve_id` must check and reserve in one step, so that two callers
//!   never receive the same identifier
//! - `take` must remove and return in one step, so that of several
//!   concurrent refreshes at most one observes the old pair
//! - A reserved identifier never resolves through `find`

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::TokenPair;

/// Storage trait for token pairs.
///
/// # Implementations
///
/// - [`MemoryTokenStore`](super::MemoryTokenStore) - in-process concurrent map
/// - [`StatelessTokenStore`](super::StatelessTokenStore) - stores nothing
/// - `warden-auth-postgres` - PostgreSQL backend
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Reserves an identifier unused at the time of return.
    ///
    /// Collisions are retried internally.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn reserve_id(&self) -> AuthResult<String>;

    /// Finds the pair stored under `id`.
    ///
    /// # Returns
    ///
    /// Returns `Some(pair)` if a pair was stored, `None` if the id is unknown
    /// or only reserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, id: &str) -> AuthResult<Option<TokenPair>>;

    /// Stores `pair` under `pair.id`, replacing any reservation or previous pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the pair cannot be stored.
    async fn put(&self, pair: &TokenPair) -> AuthResult<()>;

    /// Atomically removes and returns the pair stored under `id`.
    ///
    /// # Returns
    ///
    /// Returns `None` if no pair was stored, including when a concurrent
    /// caller took it first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take(&self, id: &str) -> AuthResult<Option<TokenPair>>;

    /// Removes the pair or reservation under `id`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove(&self, id: &str) -> AuthResult<()>;

    /// Removes every pair. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove_all(&self) -> AuthResult<()>;

    /// Removes pairs whose `expires_at_least` is before `now`, and entries
    /// that have no expiry at all.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn sweep_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;

    /// Returns `false` for backends that keep no state, in which case
    /// validation relies on the signature and the token's own time window.
    fn is_stateful(&self) -> bool;
}
