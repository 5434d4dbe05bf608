//! PostgreSQL token store for Warden.
//!
//! Persists token pairs in a single `token_pair` table so that issued tokens
//! survive restarts and can be shared by several server instances.
//!
//! # Example
//!
//! ```ignore
//! use warden_auth_postgres::PostgresTokenStore;
//!
//! let store = PostgresTokenStore::connect("postgres://localhost/warden", codec).await?;
//! store.migrate().await?;
//! ```

pub mod token;

use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use token::PostgresTokenStore;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during token storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// No free identifier could be reserved.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<StorageError> for warden_auth::AuthError {
    fn from(error: StorageError) -> Self {
        warden_auth::AuthError::storage(error.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Opens a connection pool.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the connection fails.
pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<PgPool> {
    let pool = PoolOptions::<Postgres>::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

// =============================================================================
// Tests
// =============================================================================
