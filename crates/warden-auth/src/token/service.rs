//! Token lifecycle: issuance, validation, refresh and revocation.
//!
//! Every token pair is keyed by the `jti` both halves share. Validation
//! against a stateful store is not a plain signature check: the presented
//! payload must equal, field for field, the half the store holds under that
//! `jti`. After a refresh the old `jti` is gone, so the old tokens stop
//! validating immediately.
//!
//! # Usage
//!
//! ```ignore
//! use warden_auth::token::{TokenService, TokenConfig, TokenKind};
//!
//! let config = TokenConfig::new("https://auth.example.com");
//! let service = TokenService::new(codec, store, credentials, clock, config);
//!
//! let pair = service.issue("https://auth.example.com", "alice", Some("read")).await?;
//! assert!(service.validate(pair.token.as_str(), TokenKind::Access, Some("read")).await?);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::AuthResult;
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::{CredentialVerifier, TokenStore};
use crate::token::jwt::JwtCodec;
use crate::token::model::{Payload, Token, TokenKind};
use crate::types::{TokenPair, parse_scopes};

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Default issuer (`iss`).
    pub issuer: String,

    /// Audience (`aud`), omitted when `None`.
    pub audience: Option<String>,

    /// Access token lifetime.
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    pub refresh_token_lifetime: Duration,
}

impl TokenConfig {
    /// Creates a new token configuration with default lifetimes.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: None,
            access_token_lifetime: Duration::hours(1),
            refresh_token_lifetime: Duration::days(30),
        }
    }

    /// Derives the token configuration from the auth configuration.
    #[must_use]
    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_lifetime: to_time_duration(config.oauth.access_token_lifetime),
            refresh_token_lifetime: to_time_duration(config.oauth.refresh_token_lifetime),
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }
}

fn to_time_duration(duration: std::time::Duration) -> Duration {
    Duration::seconds(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
}

/// Why a presented token was refused. Logged, never returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Malformed, badly signed, or signed with an unknown or rejected algorithm.
    DecodeFailure,
    /// No pair is stored under the token's `jti`.
    Unknown,
    /// The stored half differs from the presented payload.
    Mismatch,
    /// The requested scope was not granted.
    WrongScope,
    /// `now >= exp`.
    Expired,
    /// `now < nbf`.
    NotYetValid,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::DecodeFailure => "decode failure",
            Self::Unknown => "unknown",
            Self::Mismatch => "mismatch",
            Self::WrongScope => "wrong scope",
            Self::Expired => "expired",
            Self::NotYetValid => "not yet valid",
        };
        f.write_str(reason)
    }
}

/// A token that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    /// The decoded token.
    pub token: Token,

    /// Which half of its pair it is.
    pub kind: TokenKind,

    /// Scopes of the stored pair; empty for a stateless store.
    pub scopes: BTreeSet<String>,

    /// Client the pair was issued to; `None` for a stateless store or a
    /// pair issued without an authenticated client.
    pub client_id: Option<String>,
}

/// Claims that stay fixed across a pair's refreshes.
#[derive(Clone, Copy)]
struct Identity<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: Option<&'a str>,
    client_id: Option<&'a str>,
}

/// Token lifecycle manager.
pub struct TokenService {
    codec: Arc<JwtCodec>,
    store: Arc<dyn TokenStore>,
    credentials: Arc<dyn CredentialVerifier>,
    clock: Arc<dyn Clock>,
    config: TokenConfig,
}

impl TokenService {
    /// Creates a new token service.
    ///
    /// # Arguments
    ///
    /// * `codec` - Signs and verifies tokens
    /// * `store` - Token pair backend
    /// * `credentials` - Verifier consulted by the password grant
    /// * `clock` - Time source
    /// * `config` - Issuer and lifetimes
    #[must_use]
    pub fn new(
        codec: Arc<JwtCodec>,
        store: Arc<dyn TokenStore>,
        credentials: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
        config: TokenConfig,
    ) -> Self {
        Self {
            codec,
            store,
            credentials,
            clock,
            config,
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Current time according to the service clock.
    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Returns `true` if the backing store keeps state.
    #[must_use]
    pub fn is_stateful(&self) -> bool {
        self.store.is_stateful()
    }

    /// Issues a new token pair for `subject`, bound to no client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if either half cannot be signed, in which
    /// case the reserved id is released and nothing is stored, and
    /// `AuthError::Storage` if the store fails.
    pub async fn issue(
        &self,
        issuer: &str,
        subject: &str,
        scope: Option<&str>,
    ) -> AuthResult<TokenPair> {
        self.issue_pair(issuer, None, subject, scope).await
    }

    /// Issues a new token pair for `subject` on behalf of `client_id`.
    ///
    /// The client is recorded on the pair and survives refreshes; only that
    /// client may revoke it.
    ///
    /// # Errors
    ///
    /// Same as [`TokenService::issue`].
    pub async fn issue_for_client(
        &self,
        issuer: &str,
        client_id: &str,
        subject: &str,
        scope: Option<&str>,
    ) -> AuthResult<TokenPair> {
        self.issue_pair(issuer, Some(client_id), subject, scope).await
    }

    async fn issue_pair(
        &self,
        issuer: &str,
        client_id: Option<&str>,
        subject: &str,
        scope: Option<&str>,
    ) -> AuthResult<TokenPair> {
        let identity = Identity {
            iss: issuer,
            sub: subject,
            aud: self.config.audience.as_deref(),
            client_id,
        };

        let pair = self.mint(identity, parse_scopes(scope)).await?;
        self.store_or_release(&pair).await?;

        info!(jti = %pair.id, sub = %subject, client_id = ?client_id, "Issued token pair");
        Ok(pair)
    }

    /// Issues a token pair after verifying the subject's credentials.
    ///
    /// `client_id` is the authenticated client making the request, if any.
    ///
    /// # Returns
    ///
    /// Returns `None` if the subject is unknown or the secret does not match.
    ///
    /// # Errors
    ///
    /// Returns an error if verification, signing, or storage fails.
    pub async fn issue_with_credentials(
        &self,
        issuer: &str,
        client_id: Option<&str>,
        username: &str,
        secret: &str,
        scope: Option<&str>,
    ) -> AuthResult<Option<TokenPair>> {
        if !self.credentials.exists(username).await? {
            warn!(sub = %username, "Password grant for unknown subject");
            return Ok(None);
        }

        if !self.credentials.verify(username, secret).await? {
            warn!(sub = %username, "Password grant with wrong credentials");
            return Ok(None);
        }

        self.issue_pair(issuer, client_id, username, scope)
            .await
            .map(Some)
    }

    /// Returns `true` if `encoded` is a currently valid token of `kind`
    /// granting `expected_scope`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn validate(
        &self,
        encoded: &str,
        kind: TokenKind,
        expected_scope: Option<&str>,
    ) -> AuthResult<bool> {
        Ok(self.check(encoded, kind, expected_scope).await?.is_some())
    }

    /// Decodes and validates `encoded`, returning the token on success.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn resolve(&self, encoded: &str, kind: TokenKind) -> AuthResult<Option<Token>> {
        Ok(self
            .check(encoded, kind, None)
            .await?
            .map(|validated| validated.token))
    }

    /// Resolves a token for introspection or revocation.
    ///
    /// With no hint the access half is tried first, then the refresh half.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn introspect(
        &self,
        encoded: &str,
        hint: Option<TokenKind>,
    ) -> AuthResult<Option<ValidatedToken>> {
        let kinds = match hint {
            Some(kind) => vec![kind],
            None => vec![TokenKind::Access, TokenKind::Refresh],
        };

        for kind in kinds {
            if let Some(validated) = self.check(encoded, kind, None).await? {
                return Ok(Some(validated));
            }
        }
        Ok(None)
    }

    /// Exchanges a refresh token for a new pair.
    ///
    /// The new pair gets a new `jti` and a new validity window; scopes,
    /// subject, issuer, audience and client carry over. The old pair is retired
    /// before the new one is stored.
    ///
    /// # Returns
    ///
    /// Returns `None` if the refresh token is invalid or another refresh of
    /// the same token won the race.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or storage fails.
    pub async fn refresh(&self, encoded_refresh: &str) -> AuthResult<Option<TokenPair>> {
        // 1. Validate the refresh half
        let Some(validated) = self.check(encoded_refresh, TokenKind::Refresh, None).await? else {
            return Ok(None);
        };
        let old = validated.token.payload();
        let old_id = old.jti.clone();

        // 2. Reserve, sign and build the successor
        let identity = Identity {
            iss: &old.iss,
            sub: &old.sub,
            aud: old.aud.as_deref(),
            client_id: validated.client_id.as_deref(),
        };
        let pair = self.mint(identity, validated.scopes.clone()).await?;

        // 3. Retire the old identity; losing here means a concurrent refresh won
        if self.store.is_stateful() {
            match self.store.take(&old_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(jti = %old_id, "Refresh lost to a concurrent refresh");
                    self.release(&pair.id).await;
                    return Ok(None);
                }
                Err(e) => {
                    self.release(&pair.id).await;
                    return Err(e);
                }
            }
        }

        // 4. Persist under the new identity
        self.store_or_release(&pair).await?;

        info!(old_jti = %old_id, jti = %pair.id, "Refreshed token pair");
        Ok(Some(pair))
    }

    /// Revokes the pair stored under `jti`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn revoke(&self, jti: &str) -> AuthResult<()> {
        self.store.remove(jti).await?;
        info!(jti = %jti, "Revoked token pair");
        Ok(())
    }

    /// Revokes every pair. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn revoke_all(&self) -> AuthResult<()> {
        self.store.remove_all().await?;
        info!("Revoked all token pairs");
        Ok(())
    }

    /// Removes pairs whose refresh half expired before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn sweep_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let removed = self.store.sweep_expired(now).await?;
        if removed > 0 {
            debug!(removed, "Swept expired token pairs");
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Reserves an id and signs both halves. The pair is not stored; on
    /// failure the reservation is released.
    async fn mint(
        &self,
        identity: Identity<'_>,
        scopes: BTreeSet<String>,
    ) -> AuthResult<TokenPair> {
        let id = self.store.reserve_id().await?;

        match self.build_pair(&id, identity, scopes) {
            Ok(pair) => Ok(pair),
            Err(e) => {
                self.release(&id).await;
                Err(e)
            }
        }
    }

    async fn store_or_release(&self, pair: &TokenPair) -> AuthResult<()> {
        if let Err(e) = self.store.put(pair).await {
            self.release(&pair.id).await;
            return Err(e);
        }
        Ok(())
    }

    fn build_pair(
        &self,
        id: &str,
        identity: Identity<'_>,
        scopes: BTreeSet<String>,
    ) -> AuthResult<TokenPair> {
        let now = self.clock.now();
        let access_exp = now
            .checked_add(self.config.access_token_lifetime)
            .ok_or_else(|| AuthError::configuration("access token lifetime overflows"))?;
        let refresh_exp = now
            .checked_add(self.config.refresh_token_lifetime)
            .ok_or_else(|| AuthError::configuration("refresh token lifetime overflows"))?;

        let payload = |exp| Payload {
            iss: identity.iss.to_string(),
            sub: identity.sub.to_string(),
            aud: identity.aud.map(str::to_string),
            exp,
            nbf: now,
            iat: now,
            jti: id.to_string(),
        };

        let token = self.codec.sign(&payload(access_exp))?;
        let refresh_token = self.codec.sign(&payload(refresh_exp))?;

        Ok(TokenPair {
            id: id.to_string(),
            expires_at_least: refresh_exp,
            token,
            refresh_token,
            scopes,
            client_id: identity.client_id.map(str::to_string),
        })
    }

    async fn release(&self, id: &str) {
        if let Err(e) = self.store.remove(id).await {
            warn!(jti = %id, error = %e, "Failed to release reserved token id");
        }
    }

    async fn check(
        &self,
        encoded: &str,
        kind: TokenKind,
        expected_scope: Option<&str>,
    ) -> AuthResult<Option<ValidatedToken>> {
        match self.evaluate(encoded, kind, expected_scope).await? {
            Ok(validated) => Ok(Some(validated)),
            Err(reason) => {
                debug!(kind = %kind, reason = %reason, "Token validation failed");
                Ok(None)
            }
        }
    }

    async fn evaluate(
        &self,
        encoded: &str,
        kind: TokenKind,
        expected_scope: Option<&str>,
    ) -> AuthResult<Result<ValidatedToken, InvalidReason>> {
        let Some(token) = self.codec.decode(encoded) else {
            return Ok(Err(InvalidReason::DecodeFailure));
        };

        let (scopes, client_id) = if self.store.is_stateful() {
            let Some(stored) = self.store.find(token.jti()).await? else {
                return Ok(Err(InvalidReason::Unknown));
            };
            if stored.get(kind).payload() != token.payload() {
                return Ok(Err(InvalidReason::Mismatch));
            }
            if !stored.contains_scope(expected_scope) {
                return Ok(Err(InvalidReason::WrongScope));
            }
            (stored.scopes, stored.client_id)
        } else {
            (BTreeSet::new(), None)
        };

        let now = self.clock.now();
        let payload = token.payload();
        if now < payload.nbf {
            return Ok(Err(InvalidReason::NotYetValid));
        }
        if now >= payload.exp {
            return Ok(Err(InvalidReason::Expired));
        }

        Ok(Ok(ValidatedToken {
            token,
            kind,
            scopes,
            client_id,
        }))
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.codec.algorithm())
            .field("stateful", &self.store.is_stateful())
            .field("config", &self.config)
            .finish()
    }
}
