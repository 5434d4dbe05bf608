//! Token pair storage.
//!
//! One row per pair, keyed by the shared `jti`. A reservation is a row whose
//! token columns are still `NULL`; it never resolves through `find` or `take`.
//! Tokens are stored in their compact form and decoded with the codec on
//! read, so rows written under another signing key no longer resolve.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use warden_auth::types::{TokenPair, format_scopes, parse_scopes};
use warden_auth::{AuthResult, JwtCodec, TokenStore};

use crate::{PgPool, StorageError, StorageResult};

/// Attempts at finding an unused identifier before giving up.
const MAX_RESERVE_ATTEMPTS: usize = 8;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS token_pair (
    uuid             TEXT PRIMARY KEY,
    access_token     TEXT NULL,
    refresh_token    TEXT NULL,
    scope            TEXT NULL,
    valid_from       TIMESTAMPTZ NULL,
    expires_at_least TIMESTAMPTZ NULL,
    subject          TEXT NULL,
    client_id        TEXT NULL
)
"#;

const ADD_CLIENT_COLUMN: &str = r#"
ALTER TABLE token_pair ADD COLUMN IF NOT EXISTS client_id TEXT NULL
"#;

const CREATE_EXPIRY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS token_pair_expires_at_least_idx
    ON token_pair (expires_at_least)
"#;

type PairRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<OffsetDateTime>,
    Option<String>,
);

/// Token store backed by the `token_pair` table.
#[derive(Clone)]
pub struct PostgresTokenStore {
    pool: Arc<PgPool>,
    codec: Arc<JwtCodec>,
}

impl PostgresTokenStore {
    /// Creates a store on an existing pool.
    ///
    /// `codec` must be the one the token service signs with.
    #[must_use]
    pub fn new(pool: Arc<PgPool>, codec: Arc<JwtCodec>) -> Self {
        Self { pool, codec }
    }

    /// Connects to `database_url` and creates the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, codec: Arc<JwtCodec>) -> StorageResult<Self> {
        let pool = crate::connect(database_url, 10).await?;
        Ok(Self::new(Arc::new(pool), codec))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `token_pair` table and its expiry index if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        query(CREATE_TABLE).execute(self.pool()).await?;
        query(ADD_CLIENT_COLUMN).execute(self.pool()).await?;
        query(CREATE_EXPIRY_INDEX).execute(self.pool()).await?;
        info!("token_pair schema ready");
        Ok(())
    }

    /// Counts rows, reservations included.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> StorageResult<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM token_pair")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn try_reserve(&self) -> StorageResult<String> {
        for _ in 0..MAX_RESERVE_ATTEMPTS {
            let id = Uuid::new_v4().to_string();
            let inserted = query(
                r#"
                INSERT INTO token_pair (uuid) VALUES ($1)
                ON CONFLICT (uuid) DO NOTHING
                "#,
            )
            .bind(&id)
            .execute(self.pool())
            .await?;

            if inserted.rows_affected() == 1 {
                return Ok(id);
            }
            debug!(jti = %id, "Token id collision, retrying");
        }
        Err(StorageError::conflict(format!(
            "no unused token id after {MAX_RESERVE_ATTEMPTS} attempts"
        )))
    }

    async fn try_put(&self, pair: &TokenPair) -> StorageResult<()> {
        if pair.id.is_empty() {
            return Err(StorageError::invalid_input("token pair id is empty"));
        }

        query(
            r#"
            INSERT INTO token_pair
                (uuid, access_token, refresh_token, scope, valid_from, expires_at_least, subject, client_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (uuid) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                scope = EXCLUDED.scope,
                valid_from = EXCLUDED.valid_from,
                expires_at_least = EXCLUDED.expires_at_least,
                subject = EXCLUDED.subject,
                client_id = EXCLUDED.client_id
            "#,
        )
        .bind(&pair.id)
        .bind(pair.token.as_str())
        .bind(pair.refresh_token.as_str())
        .bind(format_scopes(&pair.scopes))
        .bind(pair.token.payload().nbf)
        .bind(pair.expires_at_least)
        .bind(pair.subject())
        .bind(pair.client_id.as_deref())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Rebuilds a pair from a row. Rows whose halves no longer decode, or
    /// disagree with the row key, resolve to nothing.
    fn pair_from_row(&self, row: PairRow) -> Option<TokenPair> {
        let (id, access, refresh, scope, expires_at_least, client_id) = row;

        let token = self.codec.decode(access.as_deref()?)?;
        let refresh_token = self.codec.decode(refresh.as_deref()?)?;
        if token.jti() != id || refresh_token.jti() != id {
            debug!(jti = %id, "Stored token pair does not match its key");
            return None;
        }

        Some(TokenPair {
            expires_at_least: expires_at_least.unwrap_or(refresh_token.payload().exp),
            id,
            token,
            refresh_token,
            scopes: parse_scopes(scope.as_deref()),
            client_id,
        })
    }
}

impl std::fmt::Debug for PostgresTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresTokenStore")
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenStore for PostgresTokenStore {
    async fn reserve_id(&self) -> AuthResult<String> {
        Ok(self.try_reserve().await?)
    }

    async fn find(&self, id: &str) -> AuthResult<Option<TokenPair>> {
        let row: Option<PairRow> = query_as(
            r#"
            SELECT uuid, access_token, refresh_token, scope, expires_at_least, client_id
            FROM token_pair
            WHERE uuid = $1
              AND access_token IS NOT NULL
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(row.and_then(|row| self.pair_from_row(row)))
    }

    async fn put(&self, pair: &TokenPair) -> AuthResult<()> {
        Ok(self.try_put(pair).await?)
    }

    async fn take(&self, id: &str) -> AuthResult<Option<TokenPair>> {
        // Single statement; of concurrent callers only one gets the row back
        let row: Option<PairRow> = query_as(
            r#"
            DELETE FROM token_pair
            WHERE uuid = $1
              AND access_token IS NOT NULL
            RETURNING uuid, access_token, refresh_token, scope, expires_at_least, client_id
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(row.and_then(|row| self.pair_from_row(row)))
    }

    async fn remove(&self, id: &str) -> AuthResult<()> {
        query("DELETE FROM token_pair WHERE uuid = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn remove_all(&self) -> AuthResult<()> {
        query("DELETE FROM token_pair")
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn sweep_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let result = query(
            r#"
            DELETE FROM token_pair
            WHERE expires_at_least IS NULL
               OR expires_at_least < $1
            "#,
        )
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }

    fn is_stateful(&self) -> bool {
        true
    }
}
